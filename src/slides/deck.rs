use base64::Engine;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Slide index -> duration in seconds.
pub type Durations = BTreeMap<usize, f64>;

/// Names a deck may use for its per-slide config array.
const CONFIG_NAMES: [&str; 2] = ["SLIDE_CONFIG", "SLIDES"];

/// `var <name> = [ ... ];` for each of `CONFIG_NAMES`, in order.
static CONFIG_ARRAYS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    CONFIG_NAMES
        .iter()
        .map(|name| {
            let re = Regex::new(&format!(r"(?s)var\s+{}\s*=\s*\[(.*?)\];", name))
                .expect("config array pattern");
            (*name, re)
        })
        .collect()
});
static DURATION_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\s*[^}]*?duration\s*:\s*([\d.]+)[^}]*?\}").expect("duration entry pattern")
});
static DURATION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(duration\s*:\s*)([\d.]+)").expect("duration field pattern"));
static SAVED_INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"SAVED_DURATIONS\s*=\s*(\{[^{}]*?"[\d]+"\s*:\s*\d+[^{}]*?\})"#)
        .expect("inline durations pattern")
});
static SAVED_MULTILINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)SAVED_DURATIONS\s*=\s*\{([^;]*?)\}\s*;").expect("multi-line durations pattern")
});
static SAVED_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(SAVED_DURATIONS\s*=\s*)\{[^;]*?\}").expect("durations object pattern")
});
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\}").expect("trailing comma pattern"));
static TOTAL_SLIDES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"var\s+TOTAL_SLIDES\s*=\s*(?:SLIDE_CONFIG\.length|(\d+))").expect("total slides pattern")
});
static NARRATIVES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)NARRATIVES\s*=\s*\[(.*?)\]").expect("narratives pattern"));
static TOTAL_STEPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"TOTAL_STEPS\s*=\s*(\d+)").expect("total steps pattern"));
static AUDIO_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"var\s+AUDIO_DATA\s*=\s*["']data:audio/([^;]+);base64,([^"']+)["']"#)
        .expect("audio data pattern")
});

/// Durations from a `var SLIDE_CONFIG = [{ duration: 33 }, ...];` array,
/// or the same shape under `var SLIDES`.
pub fn extract_slide_config(html: &str) -> Option<Durations> {
    for (name, pattern) in CONFIG_ARRAYS.iter() {
        let Some(caps) = pattern.captures(html) else {
            continue;
        };
        let durations: Durations = DURATION_ENTRY
            .captures_iter(&caps[1])
            .filter_map(|c| c[1].parse::<f64>().ok())
            .enumerate()
            .collect();
        if !durations.is_empty() {
            debug!(name = *name, slides = durations.len(), "found slide config");
            return Some(durations);
        }
    }
    None
}

fn parse_duration_map(json: &str) -> Option<Durations> {
    let raw: BTreeMap<String, f64> = serde_json::from_str(json).ok()?;
    let parsed: Option<Durations> = raw
        .into_iter()
        .map(|(k, v)| k.trim().parse::<usize>().ok().map(|k| (k, v)))
        .collect();
    parsed.filter(|d| !d.is_empty())
}

/// Saved per-slide durations.
///
/// The slide config wins when present. Otherwise every `SAVED_DURATIONS`
/// object is read, in both the inline `{"0":16,"1":10}` form and the
/// multi-line formatted form, and the most complete one is returned.
pub fn extract_saved_durations(html: &str) -> Durations {
    if let Some(config) = extract_slide_config(html) {
        return config;
    }

    let mut candidates = Vec::new();

    candidates.extend(
        SAVED_INLINE
            .captures_iter(html)
            .filter_map(|c| parse_duration_map(&c[1])),
    );

    for caps in SAVED_MULTILINE.captures_iter(html) {
        let json = format!("{{{}}}", caps[1].trim());
        let json = TRAILING_COMMA.replace_all(&json, "}");
        if let Some(map) = parse_duration_map(&json) {
            candidates.push(map);
        }
    }

    // max_by_key keeps the last of equals; prefer the first found.
    candidates
        .into_iter()
        .rev()
        .max_by_key(|d| d.len())
        .unwrap_or_default()
}

/// Number of slides declared by the deck, if it can be told.
pub fn detect_total_slides(html: &str) -> Option<usize> {
    if let Some(config) = extract_slide_config(html) {
        return Some(config.len());
    }

    if let Some(n) = TOTAL_SLIDES
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
    {
        return Some(n);
    }

    if let Some(caps) = NARRATIVES.captures(html) {
        let quotes = caps[1].chars().filter(|c| matches!(c, '"' | '\'')).count();
        if quotes / 2 > 0 {
            return Some(quotes / 2);
        }
    }

    // TOTAL_STEPS counts transitions, not slides.
    TOTAL_STEPS
        .captures(html)
        .and_then(|c| c[1].parse::<usize>().ok())
        .map(|n| n + 1)
}

/// Audio embedded in the deck as a base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedAudio {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

fn audio_extension(mime: &str) -> &'static str {
    match mime {
        "mpeg" | "mp3" => "mp3",
        "wav" | "x-wav" | "wave" => "wav",
        "ogg" => "ogg",
        "aac" => "aac",
        "mp4" | "m4a" | "x-m4a" => "m4a",
        "flac" => "flac",
        "webm" => "webm",
        _ => "mp3",
    }
}

/// Decode `var AUDIO_DATA = "data:audio/mpeg;base64,...";`.
pub fn extract_audio_data(html: &str) -> Option<EmbeddedAudio> {
    let caps = AUDIO_DATA.captures(html)?;
    let payload: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
    match base64::engine::general_purpose::STANDARD.decode(payload) {
        Ok(bytes) if !bytes.is_empty() => Some(EmbeddedAudio {
            bytes,
            extension: audio_extension(&caps[1]),
        }),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "embedded audio is not valid base64");
            None
        }
    }
}

/// A deck's slides with their resolved durations.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideDeck {
    pub durations: Vec<f64>,
    /// Whether the deck itself stored any durations.
    pub has_saved_durations: bool,
    pub has_embedded_audio: bool,
}

impl SlideDeck {
    pub fn analyze(html: &str, default_seconds: f64) -> Self {
        let saved = extract_saved_durations(html);
        let total = detect_total_slides(html)
            .or_else(|| saved.keys().next_back().map(|k| k + 1))
            .unwrap_or(1);

        let durations = (0..total)
            .map(|i| saved.get(&i).copied().unwrap_or(default_seconds))
            .collect();

        Self {
            durations,
            has_saved_durations: !saved.is_empty(),
            has_embedded_audio: extract_audio_data(html).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// When each slide starts, in seconds.
    pub fn start_times(&self) -> Vec<f64> {
        self.durations
            .iter()
            .scan(0.0, |acc, d| {
                let start = *acc;
                *acc += d;
                Some(start)
            })
            .collect()
    }

    pub fn total_duration(&self) -> f64 {
        self.durations.iter().sum()
    }

    /// Apply user edits on top of the saved durations.
    pub fn apply_overrides(&mut self, overrides: &Durations) {
        for (&i, &d) in overrides {
            if let Some(slot) = self.durations.get_mut(i) {
                if d.is_finite() && d > 0.0 {
                    *slot = d;
                }
            }
        }
    }
}

fn format_seconds(d: f64) -> String {
    if d.fract() == 0.0 {
        format!("{}", d as i64)
    } else {
        format!("{}", d)
    }
}

fn saved_durations_json(durations: &[f64]) -> String {
    let body = durations
        .iter()
        .enumerate()
        .map(|(i, d)| format!("\"{}\":{}", i, format_seconds(*d)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{}}}", body)
}

/// Write `durations` back into the deck.
///
/// Slide config entries are updated in place and every `SAVED_DURATIONS`
/// object is replaced. A deck with neither gets a script defining
/// `SAVED_DURATIONS` before `</head>`.
pub fn rewrite_durations(html: &str, durations: &[f64]) -> String {
    let mut out = html.to_string();
    let mut written = false;

    let config_body = CONFIG_ARRAYS
        .iter()
        .find_map(|(_, pattern)| pattern.captures(&out).and_then(|c| c.get(1)))
        .map(|body| (body.range(), body.as_str().to_string()));
    if let Some((range, body)) = config_body {
        let mut index = 0;
        let updated = DURATION_FIELD
            .replace_all(&body, |c: &Captures| {
                let value = durations
                    .get(index)
                    .map(|d| format_seconds(*d))
                    .unwrap_or_else(|| c[2].to_string());
                index += 1;
                format!("{}{}", &c[1], value)
            })
            .into_owned();
        out.replace_range(range, &updated);
        written = true;
    }

    let json = saved_durations_json(durations);
    if SAVED_OBJECT.is_match(&out) {
        out = SAVED_OBJECT
            .replace_all(&out, |c: &Captures| format!("{}{}", &c[1], json))
            .into_owned();
        written = true;
    }

    if !written {
        let script = format!("<script>var SAVED_DURATIONS = {};</script>\n", json);
        match out.find("</head>").or_else(|| out.find("</body>")) {
            Some(pos) => out.insert_str(pos, &script),
            None => out.push_str(&script),
        }
    }
    out
}

/// File name for a saved copy of a deck, e.g. `talk_2025-01-31_142500.html`.
pub fn copy_file_name(stem: &str, now: DateTime<Local>) -> String {
    format!("{}_{}.html", stem, now.format("%Y-%m-%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CONFIG_DECK: &str = r#"<script>
        var SLIDE_CONFIG = [
            { title: "Intro", duration: 33 },
            { title: "Body", duration: 12.5 },
            { duration: 8 },
        ];
        var TOTAL_SLIDES = SLIDE_CONFIG.length;
    </script>"#;

    #[test]
    fn test_patterns_compile() {
        assert_eq!(CONFIG_ARRAYS.len(), CONFIG_NAMES.len());
        for pattern in [
            &*DURATION_ENTRY,
            &*DURATION_FIELD,
            &*SAVED_INLINE,
            &*SAVED_MULTILINE,
            &*SAVED_OBJECT,
            &*TRAILING_COMMA,
            &*TOTAL_SLIDES,
            &*NARRATIVES,
            &*TOTAL_STEPS,
            &*AUDIO_DATA,
        ] {
            assert!(!pattern.as_str().is_empty());
        }
    }

    #[test]
    fn test_slide_config_durations() {
        let config = extract_slide_config(CONFIG_DECK).unwrap();
        assert_eq!(config.len(), 3);
        assert_eq!(config[&0], 33.0);
        assert_eq!(config[&1], 12.5);
        assert_eq!(detect_total_slides(CONFIG_DECK), Some(3));

        let slides = "var SLIDES = [{duration: 4}, {duration: 6}];";
        assert_eq!(extract_slide_config(slides).unwrap().len(), 2);
        assert!(extract_slide_config("var SLIDE_CONFIG = [];").is_none());
    }

    #[test]
    fn test_saved_durations_inline_and_multiline() {
        let inline = r#"const SAVED_DURATIONS = {"0":16,"1":10,"2":20};"#;
        let durations = extract_saved_durations(inline);
        assert_eq!(durations.len(), 3);
        assert_eq!(durations[&2], 20.0);

        let multiline = "let SAVED_DURATIONS = {\n  \"0\": 7,\n  \"1\": 9,\n};";
        let durations = extract_saved_durations(multiline);
        assert_eq!(durations.len(), 2);
        assert_eq!(durations[&1], 9.0);

        // The most complete object wins.
        let both = format!("{}\n{}", multiline, inline);
        assert_eq!(extract_saved_durations(&both).len(), 3);

        assert!(extract_saved_durations("<html></html>").is_empty());
    }

    #[test]
    fn test_detect_total_slides_fallbacks() {
        assert_eq!(detect_total_slides("var TOTAL_SLIDES = 7;"), Some(7));
        assert_eq!(
            detect_total_slides(r#"const NARRATIVES = ["", "two", 'three'];"#),
            Some(3)
        );
        assert_eq!(detect_total_slides("const TOTAL_STEPS = 4;"), Some(5));
        assert_eq!(detect_total_slides("<p>plain</p>"), None);
    }

    #[test]
    fn test_extract_audio_data() {
        let html = r#"var AUDIO_DATA = "data:audio/mpeg;base64,SGVsbG8=";"#;
        let audio = extract_audio_data(html).unwrap();
        assert_eq!(audio.bytes, b"Hello");
        assert_eq!(audio.extension, "mp3");

        let wav = r#"var AUDIO_DATA = 'data:audio/wav;base64,AAEC';"#;
        assert_eq!(extract_audio_data(wav).unwrap().extension, "wav");
        assert!(extract_audio_data(r#"var AUDIO_DATA = "data:audio/mpeg;base64,!!!";"#).is_none());
        assert!(extract_audio_data("var AUDIO_DATA = null;").is_none());
    }

    #[test]
    fn test_analyze_fills_defaults() {
        let html = r#"var SAVED_DURATIONS = {"0":16,"2":4}; var TOTAL_SLIDES = 4;"#;
        let deck = SlideDeck::analyze(html, 5.0);
        assert_eq!(deck.durations, vec![16.0, 5.0, 4.0, 5.0]);
        assert!(deck.has_saved_durations);
        assert!(!deck.has_embedded_audio);
        assert_eq!(deck.start_times(), vec![0.0, 16.0, 21.0, 25.0]);
        assert_eq!(deck.total_duration(), 30.0);
    }

    #[test]
    fn test_analyze_unknown_total() {
        let deck = SlideDeck::analyze(r#"SAVED_DURATIONS = {"0":3,"4":2};"#, 5.0);
        assert_eq!(deck.len(), 5);

        let deck = SlideDeck::analyze("<html></html>", 5.0);
        assert_eq!(deck.durations, vec![5.0]);
        assert!(!deck.has_saved_durations);
    }

    #[test]
    fn test_apply_overrides() {
        let mut deck = SlideDeck::analyze(CONFIG_DECK, 5.0);
        let overrides: Durations = [(1, 20.0), (9, 1.0), (2, -3.0)].into_iter().collect();
        deck.apply_overrides(&overrides);
        assert_eq!(deck.durations, vec![33.0, 20.0, 8.0]);
    }

    #[test]
    fn test_rewrite_slide_config() {
        let out = rewrite_durations(CONFIG_DECK, &[10.0, 2.5, 7.0]);
        let config = extract_slide_config(&out).unwrap();
        assert_eq!(config.values().copied().collect::<Vec<_>>(), vec![10.0, 2.5, 7.0]);
        assert!(out.contains(r#"title: "Intro", duration: 10 }"#));
    }

    #[test]
    fn test_rewrite_saved_durations() {
        let html = r#"<script>var SAVED_DURATIONS = {"0":16,"1":10};</script>"#;
        let out = rewrite_durations(html, &[3.0, 4.0]);
        assert!(out.contains(r#"SAVED_DURATIONS = {"0":3,"1":4};"#));

        let plain = "<html><head></head><body></body></html>";
        let out = rewrite_durations(plain, &[6.0, 1.5]);
        assert!(out.contains(r#"<script>var SAVED_DURATIONS = {"0":6,"1":1.5};</script>"#));
        assert!(out.find("SAVED_DURATIONS").unwrap() < out.find("</head>").unwrap());
        assert_eq!(extract_saved_durations(&out).len(), 2);
    }

    #[test]
    fn test_copy_file_name() {
        let now = Local.with_ymd_and_hms(2025, 1, 31, 14, 25, 0).unwrap();
        assert_eq!(copy_file_name("talk", now), "talk_2025-01-31_142500.html");
    }
}
