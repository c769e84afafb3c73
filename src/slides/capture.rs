use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Time the deck gets to render before the first key press.
const INITIAL_WAIT_MS: u64 = 3000;
/// Time allowed for each slide transition.
const TRANSITION_MS: u64 = 800;
/// Settle time after the last transition.
const SETTLE_MS: u64 = 1000;

static HEAD_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head[^>]*>").expect("head tag pattern"));

/// Hides the dot navigation, the slide counter and the buttons.
const HIDE_CHROME_CSS: &str = r#"<style>
div[style*="border-top: 1px solid"] { display: none !important; }
div[style*="position: absolute"][style*="top: 8px"][style*="right: 12px"] { display: none !important; }
button { display: none !important; }
</style>"#;

fn advance_script(steps: usize) -> String {
    format!(
        r#"<script>
window.addEventListener('load', function () {{
  function press(left) {{
    if (left <= 0) return;
    var init = {{ key: 'ArrowRight', code: 'ArrowRight', keyCode: 39, which: 39, bubbles: true }};
    var target = document.activeElement || document.body;
    target.dispatchEvent(new KeyboardEvent('keydown', init));
    target.dispatchEvent(new KeyboardEvent('keyup', init));
    setTimeout(function () {{ press(left - 1); }}, {transition});
  }}
  setTimeout(function () {{ press({steps}); }}, {initial});
}});
</script>"#,
        transition = TRANSITION_MS,
        steps = steps,
        initial = INITIAL_WAIT_MS,
    )
}

/// `file://` URL for a local path.
pub fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.starts_with('/') {
        format!("file://{}", s)
    } else {
        format!("file:///{}", s)
    }
}

/// Copy of the deck that opens on slide `index`.
///
/// A `<base>` tag keeps relative assets resolving against `base_dir`, so the
/// copy can live anywhere.
pub fn prepare_slide_html(html: &str, base_dir: &Path, index: usize) -> String {
    let mut base_url = file_url(base_dir);
    if !base_url.ends_with('/') {
        base_url.push('/');
    }
    let head_extra = format!("<base href=\"{}\">\n{}\n", base_url, HIDE_CHROME_CSS);
    let script = advance_script(index);

    let mut out = html.to_string();
    let head_end = HEAD_OPEN.find(&out).map(|m| m.end());
    match head_end {
        Some(pos) => out.insert_str(pos, &head_extra),
        None => out.insert_str(0, &head_extra),
    }

    match out.rfind("</body>") {
        Some(pos) => out.insert_str(pos, &script),
        None => out.push_str(&script),
    }
    out
}

/// Virtual time the browser runs before taking the screenshot of slide `index`.
pub fn time_budget_ms(index: usize) -> u64 {
    INITIAL_WAIT_MS + TRANSITION_MS * index as u64 + SETTLE_MS
}

pub fn screenshot_args(url: &str, output: &Path, width: u32, height: u32, budget_ms: u64) -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--hide-scrollbars".to_string(),
        "--allow-file-access-from-files".to_string(),
        format!("--window-size={},{}", width, height),
        format!("--virtual-time-budget={}", budget_ms),
        format!("--screenshot={}", output.to_string_lossy()),
        url.to_string(),
    ]
}

/// Resize a screenshot to exactly `width`x`height` when the browser
/// returned something else. Returns whether the file was rewritten.
pub fn normalize_screenshot(path: &Path, width: u32, height: u32) -> Result<bool> {
    let img = image::open(path).with_context(|| format!("reading screenshot {}", path.display()))?;
    if img.width() == width && img.height() == height {
        return Ok(false);
    }
    debug!(
        from = %format!("{}x{}", img.width(), img.height()),
        to = %format!("{}x{}", width, height),
        "resizing screenshot"
    );
    img.resize_exact(width, height, FilterType::Lanczos3)
        .save(path)
        .with_context(|| format!("writing screenshot {}", path.display()))?;
    Ok(true)
}

/// Chromium-family browser driven from the command line.
#[derive(Debug, Clone)]
pub struct HeadlessBrowser {
    path: String,
    width: u32,
    height: u32,
}

impl HeadlessBrowser {
    pub fn new(path: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Screenshot slide `index` of `html` into `output` (PNG).
    pub async fn capture(
        &self,
        html: &str,
        base_dir: &Path,
        index: usize,
        work_dir: &Path,
        output: &Path,
    ) -> Result<()> {
        let page: PathBuf = work_dir.join(format!("slide_{:03}.html", index));
        tokio::fs::write(&page, prepare_slide_html(html, base_dir, index))
            .await
            .with_context(|| format!("writing {}", page.display()))?;

        let args = screenshot_args(
            &file_url(&page),
            output,
            self.width,
            self.height,
            time_budget_ms(index),
        );
        debug!(browser = %self.path, slide = index, "capturing slide");

        let result = Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to start browser {}", self.path))?;

        if !result.status.success() || !output.exists() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join("\n");
            return Err(anyhow!(
                "screenshot of slide {} failed ({}): {}",
                index + 1,
                result.status,
                tail
            ));
        }

        normalize_screenshot(output, self.width, self.height)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url() {
        assert_eq!(file_url(Path::new("/tmp/deck.html")), "file:///tmp/deck.html");
        assert_eq!(file_url(Path::new(r"C:\decks\a.html")), "file:///C:/decks/a.html");
    }

    #[test]
    fn test_prepare_slide_html_injects() {
        let html = "<html><head><title>t</title></head><body><div></div></body></html>";
        let out = prepare_slide_html(html, Path::new("/decks"), 3);

        let base = out.find("<base href=\"file:///decks/\">").unwrap();
        assert!(base > out.find("<head>").unwrap());
        assert!(base < out.find("<title>").unwrap());
        assert!(out.contains("button { display: none !important; }"));
        assert!(out.contains("press(3)"));
        assert!(out.find("<script>").unwrap() < out.find("</body>").unwrap());
    }

    #[test]
    fn test_prepare_slide_html_without_tags() {
        let out = prepare_slide_html("<div>bare</div>", Path::new("/d/"), 0);
        assert!(out.starts_with("<base href=\"file:///d/\">"));
        assert!(out.ends_with("</script>"));
        assert!(out.contains("press(0)"));
    }

    #[test]
    fn test_screenshot_args_and_budget() {
        assert_eq!(time_budget_ms(0), 4000);
        assert_eq!(time_budget_ms(2), 5600);

        let args = screenshot_args("file:///x.html", Path::new("/f/s.png"), 1920, 1080, 4000);
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.contains(&"--virtual-time-budget=4000".to_string()));
        assert!(args.contains(&"--screenshot=/f/s.png".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("file:///x.html"));
    }

    #[test]
    fn test_normalize_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        image::RgbaImage::new(40, 30).save(&path).unwrap();

        assert!(normalize_screenshot(&path, 20, 10).unwrap());
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (20, 10));
        assert!(!normalize_screenshot(&path, 20, 10).unwrap());

        assert!(normalize_screenshot(&dir.path().join("missing.png"), 1, 1).is_err());
    }
}
