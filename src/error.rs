use crate::project::TrackKind;
use thiserror::Error;

/// Errors raised by timeline editing operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditError {
    #[error("no clip at index {index} on the {track} track")]
    ClipIndexOutOfRange { track: TrackKind, index: usize },

    #[error("no clip under the playhead on the {0} track")]
    NothingToSplit(TrackKind),

    #[error("split point {offset:.2}s is too close to the clip edge (clip is {length:.2}s)")]
    SplitOutOfRange { offset: f64, length: f64 },

    #[error("invalid trim: start {start:.2}s, end {end:.2}s on a {duration:.2}s clip")]
    InvalidTrim { start: f64, end: f64, duration: f64 },

    #[error("duration must be positive, got {0}")]
    InvalidDuration(f64),

    #[error("silence clips can only live on the speech track")]
    SilenceOutsideSpeech,

    #[error("no clip selected")]
    NothingSelected,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("nothing to render: add a video, speech or music clip first")]
    EmptyComposition,
}
