use super::capture::HeadlessBrowser;
use super::deck::{extract_audio_data, Durations, SlideDeck};
use crate::ffmpeg::{build_slideshow_args, FFmpegWrapper, RenderPlan};
use crate::utils::bytes_to_mb;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Share of the progress bar spent capturing; the rest is encoding.
const CAPTURE_SHARE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub default_seconds_per_slide: f64,
    pub max_slides: usize,
    pub crf: u32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 2,
            default_seconds_per_slide: 5.0,
            max_slides: 50,
            crf: 18,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    pub html_path: PathBuf,
    pub output: PathBuf,
    /// Overrides the durations saved in the deck.
    pub custom_durations: Option<Durations>,
    /// Takes priority over audio embedded in the deck.
    pub external_audio: Option<PathBuf>,
    pub include_audio: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionResult {
    pub success: bool,
    pub error: Option<String>,
    pub slides: usize,
    pub frames: usize,
    pub duration_s: f64,
    pub size_mb: f64,
    pub output_path: Option<PathBuf>,
    pub slide_durations: Vec<f64>,
    pub has_audio: bool,
}

impl ConversionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "{} slides, {:.1}s, {:.2} MB{}",
                self.slides,
                self.duration_s,
                self.size_mb,
                if self.has_audio { ", with audio" } else { "" }
            )
        } else {
            self.error.clone().unwrap_or_else(|| "Conversion failed".to_string())
        }
    }
}

/// Output file name for a conversion job.
pub fn conversion_filename(job_id: &str) -> String {
    format!("html2mp4_{}.mp4", job_id)
}

/// Frames written per slide. Every slide gets at least one.
pub fn plan_frames(durations: &[f64], fps: u32) -> Vec<usize> {
    durations
        .iter()
        .map(|d| ((d * fps as f64).floor().max(0.0) as usize).max(1))
        .collect()
}

/// Where the soundtrack comes from.
#[derive(Debug, Clone, PartialEq)]
enum AudioPlan {
    External(PathBuf),
    Embedded,
    Silent,
}

fn plan_audio(request: &ConversionRequest, has_embedded: bool) -> AudioPlan {
    match &request.external_audio {
        Some(path) if path.exists() => AudioPlan::External(path.clone()),
        _ if request.include_audio && has_embedded => AudioPlan::Embedded,
        _ => AudioPlan::Silent,
    }
}

pub struct SlideConverter {
    ffmpeg: FFmpegWrapper,
    browser: HeadlessBrowser,
    settings: ConversionSettings,
}

impl SlideConverter {
    pub fn new(ffmpeg: FFmpegWrapper, browser_path: &str, settings: ConversionSettings) -> Self {
        let browser = HeadlessBrowser::new(browser_path, settings.width, settings.height);
        Self {
            ffmpeg,
            browser,
            settings,
        }
    }

    /// Convert a deck, reporting progress as a 0..1 fraction with a message.
    /// Failures come back as an unsuccessful result.
    pub async fn convert<F>(&self, request: &ConversionRequest, mut on_progress: F) -> ConversionResult
    where
        F: FnMut(f32, &str) + Send,
    {
        if !self.ffmpeg.is_available() {
            return ConversionResult::failed("FFmpeg not found. Install ffmpeg and add it to PATH.");
        }
        if !self.browser.is_available() {
            return ConversionResult::failed(
                "Headless browser not found. Set browser_path in the config to Chrome or Chromium.",
            );
        }

        match self.run(request, &mut on_progress).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, html = %request.html_path.display(), "slide conversion failed");
                ConversionResult::failed(format!("{:#}", e))
            }
        }
    }

    async fn run<F>(&self, request: &ConversionRequest, on_progress: &mut F) -> Result<ConversionResult>
    where
        F: FnMut(f32, &str) + Send,
    {
        let html = tokio::fs::read_to_string(&request.html_path)
            .await
            .with_context(|| format!("reading {}", request.html_path.display()))?;
        let base_dir = request
            .html_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut deck = SlideDeck::analyze(&html, self.settings.default_seconds_per_slide);
        if let Some(custom) = &request.custom_durations {
            deck.apply_overrides(custom);
        }
        deck.durations.truncate(self.settings.max_slides.max(1));
        let frame_counts = plan_frames(&deck.durations, self.settings.fps);
        info!(slides = deck.len(), total = deck.total_duration(), "converting slide deck");

        let work = tempfile::Builder::new()
            .prefix("clipdeck_slides_")
            .tempdir()
            .context("creating frame directory")?;
        let frames_dir = work.path().join("frames");
        tokio::fs::create_dir_all(&frames_dir).await?;

        let audio = match plan_audio(request, deck.has_embedded_audio) {
            AudioPlan::External(path) => Some(path),
            AudioPlan::Embedded => match extract_audio_data(&html) {
                Some(embedded) => {
                    let path = work.path().join(format!("audio.{}", embedded.extension));
                    tokio::fs::write(&path, &embedded.bytes).await?;
                    Some(path)
                }
                None => None,
            },
            AudioPlan::Silent => None,
        };

        let mut frame_index = 0usize;
        for (slide, &count) in frame_counts.iter().enumerate() {
            on_progress(
                CAPTURE_SHARE * slide as f32 / frame_counts.len() as f32,
                &format!("Capturing slide {}/{}", slide + 1, frame_counts.len()),
            );
            let shot = work.path().join(format!("shot_{:03}.png", slide));
            self.browser
                .capture(&html, &base_dir, slide, work.path(), &shot)
                .await?;
            for _ in 0..count {
                let frame = frames_dir.join(format!("frame_{:05}.png", frame_index));
                tokio::fs::copy(&shot, &frame).await?;
                frame_index += 1;
            }
        }
        if frame_index == 0 {
            return Err(anyhow!("No frames captured"));
        }

        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let duration_s = frame_index as f64 / self.settings.fps.max(1) as f64;
        let plan = RenderPlan {
            args: build_slideshow_args(
                &frames_dir.join("frame_%05d.png"),
                self.settings.fps,
                self.settings.crf,
                audio.as_deref(),
                &request.output,
            ),
            duration: duration_s,
        };
        on_progress(CAPTURE_SHARE, "Encoding");
        self.ffmpeg
            .render(&plan, |p| {
                on_progress(CAPTURE_SHARE + (1.0 - CAPTURE_SHARE) * p, "Encoding")
            })
            .await?;

        let size = tokio::fs::metadata(&request.output).await?.len();
        let result = ConversionResult {
            success: true,
            error: None,
            slides: deck.len(),
            frames: frame_index,
            duration_s,
            size_mb: bytes_to_mb(size),
            output_path: Some(request.output.clone()),
            slide_durations: deck.durations,
            has_audio: audio.is_some(),
        };
        info!(summary = %result.summary(), "slide conversion done");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = ConversionSettings::default();
        assert_eq!((s.width, s.height, s.fps, s.crf), (1920, 1080, 2, 18));
        assert_eq!(s.max_slides, 50);
        assert_eq!(s.default_seconds_per_slide, 5.0);
    }

    #[test]
    fn test_plan_frames() {
        assert_eq!(plan_frames(&[5.0, 2.5, 0.2, 0.0], 2), vec![10, 5, 1, 1]);
        assert_eq!(plan_frames(&[3.0], 1), vec![3]);
        let total: usize = plan_frames(&[16.0, 10.0], 2).iter().sum();
        assert_eq!(total as f64 / 2.0, 26.0);
    }

    #[test]
    fn test_audio_priority() {
        let dir = tempfile::tempdir().unwrap();
        let external = dir.path().join("voice.mp3");
        std::fs::write(&external, b"x").unwrap();

        let mut request = ConversionRequest {
            external_audio: Some(external.clone()),
            include_audio: true,
            ..Default::default()
        };
        assert_eq!(plan_audio(&request, true), AudioPlan::External(external));

        request.external_audio = Some(dir.path().join("gone.mp3"));
        assert_eq!(plan_audio(&request, true), AudioPlan::Embedded);
        assert_eq!(plan_audio(&request, false), AudioPlan::Silent);

        request.include_audio = false;
        assert_eq!(plan_audio(&request, true), AudioPlan::Silent);
    }

    #[test]
    fn test_result_summary() {
        let failed = ConversionResult::failed("No frames captured");
        assert!(!failed.success);
        assert_eq!(failed.summary(), "No frames captured");

        let ok = ConversionResult {
            success: true,
            slides: 3,
            duration_s: 26.0,
            size_mb: 1.25,
            has_audio: true,
            ..Default::default()
        };
        assert_eq!(ok.summary(), "3 slides, 26.0s, 1.25 MB, with audio");
        assert_eq!(conversion_filename("ab12cd34"), "html2mp4_ab12cd34.mp4");
    }

    #[test]
    fn test_missing_tools_give_error_result() {
        let converter = SlideConverter::new(
            FFmpegWrapper::with_paths(
                "/nonexistent/ffmpeg".to_string(),
                "/nonexistent/ffprobe".to_string(),
            ),
            "/nonexistent/chromium",
            ConversionSettings::default(),
        );
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = runtime.block_on(converter.convert(&ConversionRequest::default(), |_, _| {}));
        assert!(!result.success);
        assert!(result.error.unwrap().contains("FFmpeg"));
    }
}
