//! Media session provider interface
//!
//! The traits here describe the external "now playing" source. The server
//! never assumes anything about how a session is obtained; it only consumes
//! the contract below once per tick.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Failure raised by a session query or thumbnail fetch
#[derive(Debug, Clone)]
pub struct SessionError {
    message: String,
}

impl SessionError {
    /// Create an error with a human-readable description
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SessionError {}

/// Playback state reported by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Closed,
    Opened,
    Changing,
    Stopped,
    Playing,
    Paused,
}

/// Kind of media the session is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackType {
    Unknown,
    Music,
    Video,
    Image,
}

/// Repeat mode reported by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoRepeatMode {
    None,
    Track,
    List,
}

/// Timeline position of the current item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeline {
    /// Start of the playable range
    pub start: Duration,
    /// End of the playable range
    pub end: Duration,
    /// Current playback position
    pub position: Duration,
}

impl Timeline {
    /// Length of the playable range
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Playback flags reported by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackInfo {
    /// Current transport state
    pub status: PlaybackStatus,
    /// Kind of media being played
    pub kind: PlaybackType,
    /// Whether shuffle is active
    pub shuffle: bool,
    /// Current repeat mode
    pub repeat: AutoRepeatMode,
}

/// Structured metadata for the current item
///
/// Generic over the thumbnail reference type so the attachment fetch stays
/// an external concern.
#[derive(Debug, Clone)]
pub struct MediaProperties<T> {
    pub title: String,
    pub artist: String,
    pub album_title: String,
    pub album_artist: String,
    pub genres: Vec<String>,
    pub subtitle: String,
    pub track_number: i32,
    /// Reference to the item's artwork, if any
    pub thumbnail: Option<T>,
}

/// Reference to a binary attachment (artwork) that can be fetched on demand
///
/// `Sync` because the fetch borrows the reference across an await inside
/// the spawned broadcast task.
pub trait ThumbnailRef: Send + Sync {
    /// Fetch the attachment bytes
    ///
    /// Failures are degraded by the caller to an empty attachment, never a
    /// tick failure.
    fn open(&self) -> impl Future<Output = Result<Bytes, SessionError>> + Send;
}

/// One active media session
pub trait MediaSession: Send {
    /// Thumbnail reference type produced by this session
    type Thumbnail: ThumbnailRef;

    /// Identifier of the application owning the session
    fn app_id(&self) -> String;

    /// Retrieve the item's structured metadata
    ///
    /// This is the only fallible step of snapshot assembly; a failure here
    /// becomes an error payload for the tick.
    fn try_properties(
        &self,
    ) -> impl Future<Output = Result<MediaProperties<Self::Thumbnail>, SessionError>> + Send;

    /// Current timeline position
    fn timeline(&self) -> Timeline;

    /// Current playback flags
    fn playback(&self) -> PlaybackInfo;
}

/// Source of the current media session, queried once per tick
pub trait SessionProvider: Send + Sync + 'static {
    /// Session type produced by this provider
    type Session: MediaSession;

    /// The currently active session, or `None` when nothing is playing
    fn current_session(&self) -> impl Future<Output = Option<Self::Session>> + Send;
}

/// Provider that never reports an active session
///
/// Lets the server run on platforms without a media source and gives tests
/// a trivial provider; every tick broadcasts the "no session" marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleProvider;

/// Session type of [`IdleProvider`]; never constructed
pub enum IdleSession {}

/// Thumbnail type of [`IdleSession`]; never constructed
pub enum NoThumbnail {}

impl ThumbnailRef for NoThumbnail {
    async fn open(&self) -> Result<Bytes, SessionError> {
        match *self {}
    }
}

impl MediaSession for IdleSession {
    type Thumbnail = NoThumbnail;

    fn app_id(&self) -> String {
        match *self {}
    }

    async fn try_properties(&self) -> Result<MediaProperties<NoThumbnail>, SessionError> {
        match *self {}
    }

    fn timeline(&self) -> Timeline {
        match *self {}
    }

    fn playback(&self) -> PlaybackInfo {
        match *self {}
    }
}

impl SessionProvider for IdleProvider {
    type Session = IdleSession;

    async fn current_session(&self) -> Option<IdleSession> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_duration() {
        let timeline = Timeline {
            start: Duration::from_secs(5),
            end: Duration::from_secs(185),
            position: Duration::from_secs(42),
        };
        assert_eq!(timeline.duration(), Duration::from_secs(180));
    }

    #[test]
    fn test_timeline_duration_saturates() {
        // A provider reporting end < start must not panic
        let timeline = Timeline {
            start: Duration::from_secs(10),
            end: Duration::from_secs(3),
            position: Duration::ZERO,
        };
        assert_eq!(timeline.duration(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_idle_provider_has_no_session() {
        assert!(IdleProvider.current_session().await.is_none());
    }
}
