use crate::error::EditError;
use crate::ffmpeg::MediaInfo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "m4a", "flac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Result<Self, EditError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(MediaKind::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(MediaKind::Audio)
        } else {
            Err(EditError::UnsupportedMedia(path.display().to_string()))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub info: MediaInfo,
}

impl MediaFile {
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    pub fn has_audio(&self) -> bool {
        self.info.audio_codec.is_some()
    }

    pub fn resolution_string(&self) -> String {
        if self.info.width > 0 && self.info.height > 0 {
            format!("{}x{}", self.info.width, self.info.height)
        } else {
            "N/A".to_string()
        }
    }
}
