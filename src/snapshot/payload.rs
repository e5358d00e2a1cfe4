//! Wire payload types and per-tick snapshot assembly
//!
//! Exactly one of three JSON shapes goes out per tick, identical for every
//! subscriber:
//!
//! - a success object with the session's fields and a base64 thumbnail
//!   (empty string when there is no artwork or fetching it failed),
//! - `{"Message":"No media session detected."}` when nothing is playing,
//! - `{"Error":"..."}` when reading the session's properties failed.
//!
//! Field names and nesting are a stable contract; subscribers parse them.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::provider::{
    AutoRepeatMode, MediaSession, PlaybackStatus, PlaybackType, SessionProvider, ThumbnailRef,
};

/// Marker text broadcast when no media session is active
pub const NO_SESSION_MESSAGE: &str = "No media session detected.";

/// Success payload: the current session's fields plus encoded artwork
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaInfo {
    pub app_id: String,
    pub title: String,
    pub artist: String,
    pub album_title: String,
    pub album_artist: String,
    pub genres: Vec<String>,
    pub subtitle: String,
    pub track_number: i32,
    /// Length of the playable range, in seconds
    pub duration: f64,
    /// Current playback position, in seconds
    pub position: f64,
    pub playback_status: PlaybackStatus,
    pub playback_type: PlaybackType,
    pub is_shuffle_active: bool,
    pub auto_repeat_mode: AutoRepeatMode,
    /// Base64-encoded artwork; `""` when absent or the fetch failed
    pub thumbnail_base64: String,
}

/// One immutable unit of broadcastable state, produced once per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Snapshot {
    /// An active session's fields
    Media(MediaInfo),
    /// No active media session
    NoSession {
        #[serde(rename = "Message")]
        message: String,
    },
    /// Reading the session's properties failed
    Error {
        #[serde(rename = "Error")]
        error: String,
    },
}

impl Snapshot {
    /// The "no active session" marker
    pub fn no_session() -> Self {
        Snapshot::NoSession {
            message: NO_SESSION_MESSAGE.to_string(),
        }
    }

    /// An error marker carrying a human-readable description
    pub fn error(description: impl Into<String>) -> Self {
        Snapshot::Error {
            error: description.into(),
        }
    }

    /// Serialize to the wire representation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Query the provider once and assemble this tick's snapshot
///
/// Never fails: provider errors become [`Snapshot::Error`], an absent
/// session becomes [`Snapshot::no_session`], and a thumbnail fetch failure
/// degrades to an empty attachment.
pub async fn acquire<P: SessionProvider>(provider: &P) -> Snapshot {
    let Some(session) = provider.current_session().await else {
        return Snapshot::no_session();
    };

    let app_id = session.app_id().to_lowercase();

    let props = match session.try_properties().await {
        Ok(props) => props,
        Err(e) => {
            tracing::warn!(app_id = %app_id, error = %e, "Failed to read media properties");
            return Snapshot::error(format!("Broadcast error: {}", e));
        }
    };

    let timeline = session.timeline();
    let playback = session.playback();

    let thumbnail_base64 = match props.thumbnail {
        Some(ref thumbnail) => fetch_thumbnail_base64(thumbnail).await,
        None => String::new(),
    };

    Snapshot::Media(MediaInfo {
        app_id,
        title: props.title,
        artist: props.artist,
        album_title: props.album_title,
        album_artist: props.album_artist,
        genres: props.genres,
        subtitle: props.subtitle,
        track_number: props.track_number,
        duration: timeline.duration().as_secs_f64(),
        position: timeline.position.as_secs_f64(),
        playback_status: playback.status,
        playback_type: playback.kind,
        is_shuffle_active: playback.shuffle,
        auto_repeat_mode: playback.repeat,
        thumbnail_base64,
    })
}

/// Fetch and encode the artwork; failure degrades to an empty string
async fn fetch_thumbnail_base64<T: ThumbnailRef>(thumbnail: &T) -> String {
    match thumbnail.open().await {
        Ok(bytes) => BASE64.encode(&bytes),
        Err(e) => {
            tracing::debug!(error = %e, "Thumbnail fetch failed, sending empty attachment");
            String::new()
        }
    }
}
