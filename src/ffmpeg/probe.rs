use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub framerate: Option<f64>,
    pub sample_rate: Option<u32>,
    pub format_name: String,
    pub file_size: u64,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct FFProbeOutput {
    format: Option<FFProbeFormat>,
    streams: Option<Vec<FFProbeStream>>,
}

#[derive(Debug, Deserialize)]
struct FFProbeFormat {
    duration: Option<String>,
    format_name: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    disposition: Option<FFProbeDisposition>,
}

#[derive(Debug, Deserialize)]
struct FFProbeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

/// Run ffprobe on `path` and collect duration and stream info.
pub async fn probe_file(ffprobe: &str, path: &Path) -> Result<MediaInfo> {
    let output = Command::new(ffprobe)
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .with_context(|| format!("failed to run {}", ffprobe))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("ffprobe failed for {}: {}", path.display(), stderr.trim()));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_probe_output(json: &str) -> Result<MediaInfo> {
    let probe_output: FFProbeOutput = serde_json::from_str(json)
        .map_err(|e| anyhow!("Failed to parse ffprobe output: {}", e))?;

    let mut info = MediaInfo::default();

    if let Some(format) = probe_output.format {
        info.duration = format.duration
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);
        info.format_name = format.format_name.unwrap_or_default();
        info.file_size = format.size
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
    }

    for stream in probe_output.streams.unwrap_or_default() {
        match stream.codec_type.as_deref().unwrap_or("") {
            "video" => {
                // Cover art in audio files shows up as a one-frame video stream.
                let is_cover = stream.disposition.map(|d| d.attached_pic == 1).unwrap_or(false);
                if is_cover || info.video_codec.is_some() {
                    continue;
                }
                info.video_codec = stream.codec_name;
                info.width = stream.width.unwrap_or(0);
                info.height = stream.height.unwrap_or(0);
                info.framerate = stream.r_frame_rate.and_then(|r| parse_framerate(&r));
            }
            "audio" if info.audio_codec.is_none() => {
                info.audio_codec = stream.codec_name;
                info.sample_rate = stream.sample_rate.and_then(|s| s.parse::<u32>().ok());
            }
            _ => {}
        }
    }

    Ok(info)
}

fn parse_framerate(fps_str: &str) -> Option<f64> {
    let parts: Vec<&str> = fps_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    fps_str.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_with_audio() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "r_frame_rate": "30000/1001"},
                {"codec_type": "audio", "codec_name": "aac", "sample_rate": "48000"}
            ],
            "format": {"duration": "12.480000", "format_name": "mov,mp4", "size": "1048576"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 12.48).abs() < 1e-9);
        assert_eq!(info.width, 1920);
        assert!(info.has_audio());
        assert!(info.has_video());
        assert_eq!(info.sample_rate, Some(48000));
        assert!((info.framerate.unwrap() - 29.97).abs() < 0.01);
        assert_eq!(info.file_size, 1048576);
    }

    #[test]
    fn test_parse_audio_with_cover_art() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "mp3"},
                {"codec_type": "video", "codec_name": "mjpeg", "disposition": {"attached_pic": 1}}
            ],
            "format": {"duration": "180.0"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(info.has_audio());
        assert!(!info.has_video());
        assert_eq!(info.duration, 180.0);
    }

    #[test]
    fn test_parse_silent_video_and_garbage() {
        let info = parse_probe_output(r#"{"streams": [{"codec_type": "video", "codec_name": "vp9"}]}"#).unwrap();
        assert!(!info.has_audio());
        assert_eq!(info.duration, 0.0);

        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn test_parse_framerate() {
        assert_eq!(parse_framerate("30/1"), Some(30.0));
        assert_eq!(parse_framerate("25"), Some(25.0));
        assert_eq!(parse_framerate("1/0"), None);
    }
}
