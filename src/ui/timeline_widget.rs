use crate::project::{ClipRef, PlayheadMapper, Timeline, TrackKind, MAX_ZOOM, MIN_ZOOM};
use crate::utils::format_clock;
use eframe::egui;

const RULER_HEIGHT: f32 = 24.0;
const TRACK_HEIGHT: f32 = 44.0;
const TRACK_GAP: f32 = 4.0;

fn track_color(kind: TrackKind) -> egui::Color32 {
    match kind {
        TrackKind::Video => egui::Color32::from_rgb(100, 149, 237),
        TrackKind::Speech => egui::Color32::from_rgb(100, 200, 100),
        TrackKind::Music => egui::Color32::from_rgb(237, 149, 100),
    }
}

/// Three-track timeline with a ruler and a global playhead
pub struct TimelineWidget<'a> {
    timeline: &'a Timeline,
    mapper: PlayheadMapper,
    playhead: f64,
    selection: Option<ClipRef>,
    scroll: f32,
}

#[derive(Debug, Default)]
pub struct TimelineResponse {
    pub seek_to: Option<f64>,
    pub select: Option<ClipRef>,
    pub clear_selection: bool,
    pub remove: Option<ClipRef>,
    pub split: Option<TrackKind>,
    pub zoom_changed: Option<f32>,
    pub scroll_changed: Option<f32>,
    /// Visible width, for auto-scroll during playback.
    pub viewport_width: f32,
    pub is_scrubbing: bool,
}

impl<'a> TimelineWidget<'a> {
    pub fn new(timeline: &'a Timeline, mapper: PlayheadMapper) -> Self {
        Self {
            timeline,
            mapper,
            playhead: 0.0,
            selection: None,
            scroll: 0.0,
        }
    }

    pub fn playhead(mut self, time: f64) -> Self {
        self.playhead = time;
        self
    }

    pub fn selection(mut self, selection: Option<ClipRef>) -> Self {
        self.selection = selection;
        self
    }

    pub fn scroll(mut self, scroll: f32) -> Self {
        self.scroll = scroll;
        self
    }

    /// Screen x of a timeline time.
    fn screen_x(&self, rect: egui::Rect, time: f64) -> f32 {
        rect.left() - self.scroll + self.mapper.time_to_x(time)
    }

    fn track_rect(&self, rect: egui::Rect, row: usize) -> egui::Rect {
        let top = rect.top() + RULER_HEIGHT + TRACK_GAP + row as f32 * (TRACK_HEIGHT + TRACK_GAP);
        egui::Rect::from_min_size(
            egui::pos2(rect.left(), top),
            egui::vec2(rect.width(), TRACK_HEIGHT),
        )
    }

    /// Clip under a screen position, if any.
    fn hit_test(&self, rect: egui::Rect, pos: egui::Pos2) -> Option<ClipRef> {
        let kind = TrackKind::all()
            .iter()
            .enumerate()
            .find(|(row, _)| self.track_rect(rect, *row).contains(pos))
            .map(|(_, kind)| *kind)?;
        let time = self.mapper.x_to_time(pos.x - rect.left() + self.scroll);
        self.timeline
            .clip_at(kind, time)
            .map(|(index, _)| ClipRef { track: kind, index })
    }

    pub fn show(self, ui: &mut egui::Ui) -> TimelineResponse {
        let total = self.timeline.total_duration();
        let width = ui.available_width();
        let height = RULER_HEIGHT + TRACK_GAP + TrackKind::all().len() as f32 * (TRACK_HEIGHT + TRACK_GAP);

        let (rect, ui_response) =
            ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::click_and_drag());

        let mut response = TimelineResponse {
            viewport_width: width,
            ..Default::default()
        };

        if !ui.is_rect_visible(rect) {
            return response;
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, egui::Color32::from_gray(30));

        self.draw_ruler(&painter, rect, total);
        for (row, kind) in TrackKind::all().iter().enumerate() {
            self.draw_track(&painter, self.track_rect(rect, row), *kind);
        }
        self.draw_playhead(&painter, rect);

        if ui_response.clicked() {
            if let Some(pos) = ui_response.interact_pointer_pos() {
                match self.hit_test(rect, pos) {
                    Some(clip) => response.select = Some(clip),
                    None => response.clear_selection = true,
                }
                response.seek_to = Some(self.mapper.x_to_time(pos.x - rect.left() + self.scroll));
            }
        }

        // Remember which clip the context menu belongs to.
        let menu_id = ui_response.id.with("context_clip");
        if ui_response.secondary_clicked() {
            let hit = ui_response
                .interact_pointer_pos()
                .and_then(|pos| self.hit_test(rect, pos));
            ui.data_mut(|d| d.insert_temp(menu_id, hit));
        }
        ui_response.context_menu(|ui| {
            let target = ui.data(|d| d.get_temp::<Option<ClipRef>>(menu_id)).flatten();
            let Some(clip) = target else {
                ui.label("No clip here");
                return;
            };
            if ui.button("Split at playhead").clicked() {
                response.split = Some(clip.track);
                ui.close_menu();
            }
            if ui.button("Remove clip").clicked() {
                response.remove = Some(clip);
                ui.close_menu();
            }
        });

        // Ctrl+wheel zooms, plain wheel scrolls
        let hovered = ui_response.hovered();
        let (wheel, ctrl) = ui.input(|i| (i.raw_scroll_delta, i.modifiers.ctrl));
        if hovered && ctrl && wheel.y != 0.0 {
            let zoom = (self.mapper.pixels_per_second * (1.0 + wheel.y * 0.002)).clamp(MIN_ZOOM, MAX_ZOOM);
            response.zoom_changed = Some(zoom);
        } else if hovered && (wheel.x != 0.0 || wheel.y != 0.0) {
            let max_scroll = (self.mapper.content_width(total) - width).max(0.0);
            let delta = if wheel.x != 0.0 { wheel.x } else { wheel.y };
            response.scroll_changed = Some((self.scroll - delta).clamp(0.0, max_scroll));
        }

        if ui_response.dragged() {
            if let Some(pos) = ui_response.interact_pointer_pos() {
                response.seek_to = Some(self.mapper.x_to_time(pos.x - rect.left() + self.scroll));
                response.is_scrubbing = true;
            }
        }

        response
    }

    fn draw_ruler(&self, painter: &egui::Painter, rect: egui::Rect, total: f64) {
        let ruler = egui::Rect::from_min_size(rect.min, egui::vec2(rect.width(), RULER_HEIGHT));
        painter.rect_filled(ruler, 0.0, egui::Color32::from_gray(35));

        for mark in self.mapper.ruler_marks(total) {
            let x = self.screen_x(rect, mark.time);
            if x < ruler.left() || x > ruler.right() {
                continue;
            }
            let tick = if mark.label.is_some() { 12.0 } else { 6.0 };
            painter.line_segment(
                [egui::pos2(x, ruler.bottom() - tick), egui::pos2(x, ruler.bottom())],
                egui::Stroke::new(1.0, egui::Color32::GRAY),
            );
            if let Some(label) = mark.label {
                painter.text(
                    egui::pos2(x + 2.0, ruler.top() + 2.0),
                    egui::Align2::LEFT_TOP,
                    label,
                    egui::FontId::proportional(10.0),
                    egui::Color32::LIGHT_GRAY,
                );
            }
        }
    }

    fn draw_track(&self, painter: &egui::Painter, track: egui::Rect, kind: TrackKind) {
        painter.rect_filled(track, 2.0, egui::Color32::from_gray(40));

        // Clips sit in a row padded by the left offset.
        let origin = track.left() - self.scroll + self.mapper.left_offset;
        let mut start = 0.0;
        for (index, clip) in self.timeline.track(kind).iter().enumerate() {
            let length = clip.trimmed_duration();
            let left = origin + self.mapper.clip_x(start);
            let right = left + self.mapper.width_for(length);
            start += length;

            if right < track.left() || left > track.right() {
                continue;
            }

            let clip_rect = egui::Rect::from_min_max(
                egui::pos2(left.max(track.left()), track.top() + 2.0),
                egui::pos2(right.min(track.right()), track.bottom() - 2.0),
            );
            let selected = self.selection == Some(ClipRef { track: kind, index });
            let fill = if clip.is_silence() {
                egui::Color32::from_gray(70)
            } else {
                track_color(kind).gamma_multiply(if selected { 0.9 } else { 0.55 })
            };
            painter.rect_filled(clip_rect, 3.0, fill);
            painter.rect_stroke(
                clip_rect,
                3.0,
                if selected {
                    egui::Stroke::new(2.0, egui::Color32::WHITE)
                } else {
                    egui::Stroke::new(1.0, egui::Color32::from_gray(20))
                },
            );

            if clip_rect.width() > 40.0 {
                let label = format!("{} ({})", clip.display_name(), format_clock(length));
                painter.with_clip_rect(clip_rect).text(
                    egui::pos2(clip_rect.left() + 4.0, clip_rect.top() + 3.0),
                    egui::Align2::LEFT_TOP,
                    label,
                    egui::FontId::proportional(10.0),
                    egui::Color32::WHITE,
                );
            }
        }

        painter.text(
            egui::pos2(track.left() + 2.0, track.bottom() - 2.0),
            egui::Align2::LEFT_BOTTOM,
            kind.label(),
            egui::FontId::proportional(9.0),
            egui::Color32::from_gray(150),
        );
    }

    fn draw_playhead(&self, painter: &egui::Painter, rect: egui::Rect) {
        let x = self.screen_x(rect, self.playhead);
        if x < rect.left() || x > rect.right() {
            return;
        }
        let color = egui::Color32::from_rgb(255, 80, 80);

        painter.line_segment(
            [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
            egui::Stroke::new(4.0, egui::Color32::from_rgba_unmultiplied(255, 80, 80, 60)),
        );
        painter.line_segment(
            [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
            egui::Stroke::new(2.0, color),
        );
        painter.add(egui::Shape::convex_polygon(
            vec![
                egui::pos2(x, rect.top() + 14.0),
                egui::pos2(x - 8.0, rect.top()),
                egui::pos2(x + 8.0, rect.top()),
            ],
            color,
            egui::Stroke::new(1.0, egui::Color32::WHITE),
        ));
    }
}
