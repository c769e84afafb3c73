use crate::utils::format_clock;

pub const DEFAULT_PIXELS_PER_SECOND: f32 = 20.0;
pub const DEFAULT_LEFT_OFFSET: f32 = 20.0;
pub const MIN_RULER_SECONDS: f64 = 30.0;
pub const MIN_ZOOM: f32 = 5.0;
pub const MAX_ZOOM: f32 = 200.0;
const LABEL_EVERY_SECONDS: u64 = 5;
const SCROLL_MARGIN: f32 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RulerMark {
    pub time: f64,
    pub x: f32,
    pub label: Option<String>,
}

/// Maps timeline seconds to pixels and back.
///
/// Tracks are drawn inside a container padded by `left_offset`; the playhead
/// lives in the outer container, so its x includes the padding while clip
/// edges inside a track do not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayheadMapper {
    pub pixels_per_second: f32,
    pub left_offset: f32,
}

impl PlayheadMapper {
    pub fn new(pixels_per_second: f32, left_offset: f32) -> Self {
        Self {
            pixels_per_second: pixels_per_second.clamp(MIN_ZOOM, MAX_ZOOM),
            left_offset: left_offset.max(0.0),
        }
    }

    /// Playhead x: `position × pps + left_offset`.
    pub fn time_to_x(&self, time: f64) -> f32 {
        time as f32 * self.pixels_per_second + self.left_offset
    }

    pub fn x_to_time(&self, x: f32) -> f64 {
        (((x - self.left_offset) / self.pixels_per_second) as f64).max(0.0)
    }

    /// Clip edge x inside a padded track.
    pub fn clip_x(&self, time: f64) -> f32 {
        time as f32 * self.pixels_per_second
    }

    pub fn width_for(&self, duration: f64) -> f32 {
        duration.max(0.0) as f32 * self.pixels_per_second
    }

    pub fn set_zoom(&mut self, pixels_per_second: f32) {
        self.pixels_per_second = pixels_per_second.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Ruler span: whole seconds covering `total`, never shorter than 30s.
    pub fn ruler_length(&self, total: f64) -> f64 {
        total.max(0.0).ceil().max(MIN_RULER_SECONDS)
    }

    /// Full content width for a timeline of `total` seconds.
    pub fn content_width(&self, total: f64) -> f32 {
        self.time_to_x(self.ruler_length(total)) + self.left_offset
    }

    /// One tick per second, labelled every five seconds.
    pub fn ruler_marks(&self, total: f64) -> Vec<RulerMark> {
        let length = self.ruler_length(total) as u64;
        (0..=length)
            .map(|second| RulerMark {
                time: second as f64,
                x: self.clip_x(second as f64),
                label: (second % LABEL_EVERY_SECONDS == 0).then(|| format_clock(second as f64)),
            })
            .collect()
    }

    /// Scroll offset that keeps the playhead visible with a margin.
    pub fn auto_scroll(&self, scroll: f32, viewport_width: f32, time: f64) -> f32 {
        let x = self.time_to_x(time);
        let margin = SCROLL_MARGIN.min(viewport_width / 2.0);
        if x < scroll + margin {
            (x - margin).max(0.0)
        } else if x > scroll + viewport_width - margin {
            x - viewport_width + margin
        } else {
            scroll
        }
    }
}

impl Default for PlayheadMapper {
    fn default() -> Self {
        Self::new(DEFAULT_PIXELS_PER_SECOND, DEFAULT_LEFT_OFFSET)
    }
}
