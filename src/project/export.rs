use crate::storage::sanitize_filename;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the rendered file takes its audio from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioSource {
    /// Speech and music tracks; falls back to clip audio when both are empty.
    #[default]
    Editor,
    /// Audio embedded in the video clips.
    Video,
    /// Silent output.
    None,
}

impl AudioSource {
    pub fn all() -> &'static [AudioSource] {
        &[AudioSource::Editor, AudioSource::Video, AudioSource::None]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioSource::Editor => "Speech + music",
            AudioSource::Video => "Video audio",
            AudioSource::None => "No audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub duration_s: f64,
    pub kind: String,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            duration_s: 1.0,
            kind: "fade".to_string(),
        }
    }
}

/// xfade transitions offered in the export dialog.
pub const TRANSITIONS: &[(&str, &str)] = &[
    ("fade", "Fade"),
    ("dissolve", "Dissolve"),
    ("wipeleft", "Wipe left"),
    ("wiperight", "Wipe right"),
    ("slideleft", "Slide left"),
    ("fadeblack", "Fade through black"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSettings {
    pub crossfade: Transition,
    pub music_fade_in: f64,
    pub music_fade_out: f64,
    pub audio_source: AudioSource,
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            crossfade: Transition::default(),
            music_fade_in: 1.0,
            music_fade_out: 2.0,
            audio_source: AudioSource::Editor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Preview,
    Export,
}

impl RenderTarget {
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            RenderTarget::Preview => (1280, 720),
            RenderTarget::Export => (1920, 1080),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RenderTarget::Preview => "Preview",
            RenderTarget::Export => "Export",
        }
    }
}

/// One clip as the renderer sees it: where to read from and for how long.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInput {
    /// `None` renders generated silence.
    pub path: Option<PathBuf>,
    pub trim_start: f64,
    pub length: f64,
    pub trimmed: bool,
    pub has_audio: bool,
}

/// Everything needed to build one render command.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionInput {
    pub video: Vec<ClipInput>,
    pub speech: Vec<ClipInput>,
    pub music: Vec<ClipInput>,
    pub speech_gain: f64,
    pub music_gain: f64,
    pub settings: CompositionSettings,
    pub width: u32,
    pub height: u32,
}

/// Export file name: `<ts>_<custom>.mp4` or `export_<ts>_<job>.mp4`.
pub fn export_filename(custom: Option<&str>, now: DateTime<Local>, job_id: &str) -> String {
    let timestamp = now.format("%Y%m%d_%H%M%S");
    let custom = custom.map(sanitize_filename).filter(|name| !name.is_empty());

    match custom {
        Some(mut name) => {
            if !name.to_lowercase().ends_with(".mp4") {
                name.push_str(".mp4");
            }
            format!("{}_{}", timestamp, name)
        }
        None => format!("export_{}_{}.mp4", timestamp, job_id),
    }
}

pub fn preview_filename(job_id: &str) -> String {
    format!("preview_{}.mp4", job_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 4, 15, 7, 9).unwrap()
    }

    #[test]
    fn test_export_filename_custom() {
        let name = export_filename(Some("My Final Cut"), fixed_time(), "ab12");
        assert_eq!(name, "20260304_150709_My_Final_Cut.mp4");

        let name = export_filename(Some("clip.MP4"), fixed_time(), "ab12");
        assert_eq!(name, "20260304_150709_clip.MP4");
    }

    #[test]
    fn test_export_filename_default() {
        assert_eq!(
            export_filename(None, fixed_time(), "ab12"),
            "export_20260304_150709_ab12.mp4"
        );
        assert_eq!(
            export_filename(Some("   "), fixed_time(), "ab12"),
            "export_20260304_150709_ab12.mp4"
        );
    }

    #[test]
    fn test_render_targets() {
        assert_eq!(RenderTarget::Preview.resolution(), (1280, 720));
        assert_eq!(RenderTarget::Export.resolution(), (1920, 1080));
    }

    #[test]
    fn test_default_settings() {
        let settings = CompositionSettings::default();
        assert_eq!(settings.crossfade.duration_s, 1.0);
        assert_eq!(settings.crossfade.kind, "fade");
        assert_eq!(settings.music_fade_in, 1.0);
        assert_eq!(settings.music_fade_out, 2.0);
        assert_eq!(settings.audio_source, AudioSource::Editor);
    }
}
