//! Snapshot acquisition and wire payload
//!
//! One [`Snapshot`] is produced per broadcast tick by querying a
//! [`SessionProvider`]: either the current session's structured fields (with
//! an optional base64 thumbnail), an explicit "no session" marker, or an
//! error marker carrying a failure description. The JSON shapes are a
//! stable wire contract consumed by subscribers.
//!
//! The provider abstracts the OS-level "now playing" query (Windows SMTC in
//! the reference deployment); platform integrations implement the traits in
//! [`provider`] out of tree.

pub mod payload;
pub mod provider;

pub use payload::{acquire, MediaInfo, Snapshot, NO_SESSION_MESSAGE};
pub use provider::{
    AutoRepeatMode, IdleProvider, MediaProperties, MediaSession, PlaybackInfo, PlaybackStatus,
    PlaybackType, SessionError, SessionProvider, ThumbnailRef, Timeline,
};
