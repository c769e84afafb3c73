use super::compose::RenderPlan;
use super::probe::{probe_file, MediaInfo};
use super::progress::parse_progress_line;
use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Lines of stderr kept for error reports.
const STDERR_TAIL: usize = 12;

#[derive(Debug, Clone)]
pub struct FFmpegWrapper {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FFmpegWrapper {
    pub fn with_paths(ffmpeg_path: String, ffprobe_path: String) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    /// Check if FFmpeg is available
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        probe_file(&self.ffprobe_path, path).await
    }

    /// Render a timeline, reporting progress as a 0..1 fraction.
    pub async fn render<F>(&self, plan: &RenderPlan, on_progress: F) -> Result<()>
    where
        F: FnMut(f32) + Send,
    {
        self.execute_ffmpeg(&plan.args, plan.duration, on_progress).await
    }

    /// Execute an FFmpeg command, parsing `-progress` output from stdout.
    async fn execute_ffmpeg<F>(&self, args: &[String], total_duration: f64, mut on_progress: F) -> Result<()>
    where
        F: FnMut(f32) + Send,
    {
        debug!(ffmpeg = %self.ffmpeg_path, args = ?args, "spawning ffmpeg");

        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-nostats", "-progress", "pipe:1"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", self.ffmpeg_path))?;

        let stdout = child.stdout.take().ok_or_else(|| anyhow!("Failed to capture stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| anyhow!("Failed to capture stderr"))?;

        // Drain stderr concurrently so FFmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.contains("Error") || line.contains("error") {
                    warn!("ffmpeg: {}", line);
                }
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let mut reader = BufReader::new(stdout).lines();
        while let Some(line) = reader.next_line().await? {
            if let Some(fraction) = parse_progress_line(&line, total_duration) {
                on_progress(fraction);
            }
        }

        let status = child.wait().await?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if status.success() {
            on_progress(1.0);
            Ok(())
        } else {
            Err(anyhow!("FFmpeg exited with status: {}\n{}", status, stderr_tail))
        }
    }
}
