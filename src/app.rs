use crate::config::AppConfig;
use crate::error::EditError;
use crate::ffmpeg::{build_composition_args, FFmpegWrapper, MediaInfo, RenderPlan};
use crate::jobs::{
    create_shared_queue, JobKind, JobQueue, SharedQueue, STAGE_FINALIZING, STAGE_PREPARING,
    STAGE_RENDERING,
};
use crate::playback::PlaybackClock;
use crate::project::{
    export_filename, preview_filename, Clip, ClipRef, CompositionSettings, Editor, MediaFile,
    MediaKind, PlayheadMapper, RenderTarget, TrackKind,
};
use crate::slides::{
    conversion_filename, copy_file_name, rewrite_durations, ConversionRequest, ConversionResult,
    ConversionSettings, Durations, SlideConverter, SlideDeck,
};
use crate::storage::{DirUsage, ExportEntry, Workspace};
use anyhow::Result;
use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use eframe::egui;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

/// Results sent back to the UI thread from background tasks.
#[derive(Debug)]
pub enum AppEvent {
    Probed { file: MediaFile, track: TrackKind },
    JobFinished {
        kind: JobKind,
        output: PathBuf,
        result: Result<String, String>,
    },
    Converted(ConversionResult),
}

/// Work attached to a queued job, handed over when the job starts.
enum PendingWork {
    Render(RenderPlan),
    Convert(ConversionRequest),
}

/// Trim values being edited for the selected clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimDraft {
    pub clip: ClipRef,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Editor,
    Slides,
    Exports,
}

/// The deck loaded in the HTML → MP4 tab.
#[derive(Debug, Default)]
pub struct SlidesState {
    pub html_path: Option<PathBuf>,
    pub html: String,
    pub deck: Option<SlideDeck>,
    /// Durations as read from the file, for "reset".
    pub saved: Vec<f64>,
    pub external_audio: Option<PathBuf>,
    pub include_audio: bool,
    pub result: Option<ConversionResult>,
}

pub struct EditorApp {
    pub config: AppConfig,
    pub editor: Editor,
    pub ffmpeg: FFmpegWrapper,
    pub runtime: Runtime,
    pub workspace: Workspace,
    pub queue: SharedQueue,
    pending: HashMap<String, PendingWork>,
    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    pending_probes: usize,

    /// Probed files by path, used for clip audio detection.
    pub media: HashMap<PathBuf, MediaFile>,

    pub clock: PlaybackClock,
    pub mapper: PlayheadMapper,
    pub timeline_scroll: f32,
    pub timeline_viewport: f32,

    pub composition: CompositionSettings,
    pub export_name: String,
    pub show_export_settings: bool,
    pub silence_seconds: f64,
    pub trim_draft: Option<TrimDraft>,

    pub slides: SlidesState,
    pub exports: Vec<ExportEntry>,
    pub storage: Vec<DirUsage>,

    pub tab: Tab,
    pub status_message: String,
}

impl EditorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, runtime: Runtime) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let workspace = Workspace::new(&config.workspace_dir);
        let mut status_message = String::from("Ready");
        if let Err(e) = workspace.ensure() {
            error!(error = %e, "cannot create workspace");
            status_message = format!("Workspace unavailable: {}", e);
        } else {
            let max_age = Duration::from_secs(config.preview_max_age_hours * 3600);
            if let Err(e) = workspace.cleanup(max_age) {
                warn!(error = %e, "preview cleanup failed");
            }
        }

        let ffmpeg = FFmpegWrapper::with_paths(config.ffmpeg_path.clone(), config.ffprobe_path.clone());
        if !ffmpeg.is_available() {
            warn!(ffmpeg = %config.ffmpeg_path, "ffmpeg not found");
            status_message = "FFmpeg not found: rendering is disabled until it is installed".to_string();
        }

        let (events_tx, events_rx) = unbounded();
        let mut app = Self {
            editor: Editor::new(config.undo_limit),
            mapper: PlayheadMapper::new(config.pixels_per_second, config.playhead_left_offset),
            ffmpeg,
            runtime,
            workspace,
            queue: create_shared_queue(),
            pending: HashMap::new(),
            events_tx,
            events_rx,
            pending_probes: 0,
            media: HashMap::new(),
            clock: PlaybackClock::new(),
            timeline_scroll: 0.0,
            timeline_viewport: 0.0,
            composition: CompositionSettings::default(),
            export_name: String::new(),
            show_export_settings: false,
            silence_seconds: 2.0,
            trim_draft: None,
            slides: SlidesState::default(),
            exports: Vec::new(),
            storage: Vec::new(),
            tab: Tab::Editor,
            status_message,
            config,
        };
        app.refresh_storage();
        app
    }

    // ---- Media ----

    /// Probe files in the background and add them to `track` when done.
    pub fn add_files(&mut self, paths: Vec<PathBuf>, track: TrackKind) {
        for path in paths {
            let kind = match MediaKind::from_path(&path) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(path = %path.display(), "skipping unsupported file");
                    self.status_message = e.to_string();
                    continue;
                }
            };
            if track == TrackKind::Video && kind != MediaKind::Video {
                self.status_message = format!("{} has no video", path.display());
                continue;
            }

            let ffmpeg = self.ffmpeg.clone();
            let tx = self.events_tx.clone();
            self.pending_probes += 1;
            self.runtime.spawn(async move {
                // A failed probe still adds the file, with no duration.
                let info = match ffmpeg.probe(&path).await {
                    Ok(info) => info,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "probe failed");
                        MediaInfo::default()
                    }
                };
                let _ = tx.send(AppEvent::Probed {
                    file: MediaFile { path, kind, info },
                    track,
                });
            });
        }
        if self.pending_probes > 0 {
            self.status_message = "Reading media...".to_string();
        }
    }

    /// Dropped files: video to the video track, audio to speech.
    pub fn add_dropped(&mut self, paths: Vec<PathBuf>) {
        let (videos, others): (Vec<_>, Vec<_>) = paths
            .into_iter()
            .partition(|p| MediaKind::from_path(p) == Ok(MediaKind::Video));
        if !videos.is_empty() {
            self.add_files(videos, TrackKind::Video);
        }
        if !others.is_empty() {
            self.add_files(others, TrackKind::Speech);
        }
    }

    /// Place an already probed file on a track again.
    pub fn add_media_clip(&mut self, path: &Path, track: TrackKind) {
        let Some(file) = self.media.get(path) else { return };
        if track == TrackKind::Video && file.kind != MediaKind::Video {
            self.status_message = format!("{} has no video", file.filename());
            return;
        }
        let clip = Clip::media(path, file.duration());
        let done = format!("Added {} to {}", file.filename(), track.label());
        let result = self.editor.add_clip(track, clip);
        self.report(result, &done);
    }

    /// Trim values for the selected clip, reloaded when the selection changes.
    pub fn trim_draft(&mut self) -> Option<&mut TrimDraft> {
        let selected = self.editor.selection()?;
        let stale = self.trim_draft.map(|d| d.clip != selected).unwrap_or(true);
        if stale {
            let clip = self.editor.timeline().clip(selected.track, selected.index)?;
            self.trim_draft = Some(TrimDraft {
                clip: selected,
                start: clip.trim_start,
                end: clip.trim_end,
            });
        }
        self.trim_draft.as_mut()
    }

    fn clip_has_audio(&self, path: &Path) -> bool {
        self.media.get(path).map(MediaFile::has_audio).unwrap_or(false)
    }

    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Probed { file, track } => {
                    self.pending_probes = self.pending_probes.saturating_sub(1);
                    let clip = Clip::media(file.path.clone(), file.duration());
                    let name = file.filename();
                    self.media.insert(file.path.clone(), file);
                    let result = self.editor.add_clip(track, clip);
                    self.report(result, &format!("Added {} to {}", name, track.label()));
                }
                AppEvent::JobFinished { kind, output, result } => {
                    self.refresh_storage();
                    match result {
                        Ok(summary) => {
                            self.status_message = format!("{} ready: {}", kind.name(), summary);
                            if kind == JobKind::Preview {
                                self.open_path(&output);
                            }
                        }
                        Err(e) => self.status_message = format!("{} failed: {}", kind.name(), e),
                    }
                }
                AppEvent::Converted(result) => {
                    self.refresh_storage();
                    self.status_message = result.summary();
                    self.slides.result = Some(result);
                }
            }
        }
    }

    // ---- Editing ----

    /// Show the outcome of an edit in the status bar.
    fn report<T>(&mut self, result: Result<T, EditError>, done: &str) -> Option<T> {
        match result {
            Ok(value) => {
                self.status_message = done.to_string();
                self.clock.set_time(self.editor.playhead());
                Some(value)
            }
            Err(e) => {
                debug!(error = %e, "edit rejected");
                self.status_message = e.to_string();
                None
            }
        }
    }

    pub fn undo(&mut self) {
        match self.editor.undo() {
            Ok(label) => {
                self.clock.set_time(self.editor.playhead());
                self.status_message = format!("Undid: {}", label);
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    pub fn redo(&mut self) {
        match self.editor.redo() {
            Ok(label) => {
                self.clock.set_time(self.editor.playhead());
                self.status_message = format!("Redid: {}", label);
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    pub fn delete_selected(&mut self) {
        let result = self.editor.delete_selected();
        self.report(result, "Clip removed");
    }

    pub fn split_selected(&mut self) {
        let result = self.editor.split_selected_at_playhead();
        self.report(result, "Clip split at playhead");
    }

    pub fn split_track(&mut self, track: TrackKind) {
        let result = self.editor.split_at_playhead(track);
        self.report(result, &format!("{} clip split at playhead", track.label()));
    }

    pub fn remove_clip(&mut self, clip: ClipRef) {
        let result = self.editor.remove_clip(clip.track, clip.index);
        self.report(result, "Clip removed");
    }

    pub fn select_clip(&mut self, clip: ClipRef) {
        let name = self
            .editor
            .timeline()
            .clip(clip.track, clip.index)
            .map(|c| c.display_name())
            .unwrap_or_default();
        let result = self.editor.select(clip.track, clip.index);
        self.report(result, &format!("Selected {}", name));
    }

    /// Move the selected clip one slot left (`-1`) or right (`1`).
    pub fn nudge_selected(&mut self, delta: isize) {
        let Some(sel) = self.editor.selection() else {
            self.status_message = EditError::NothingSelected.to_string();
            return;
        };
        let Some(to) = sel.index.checked_add_signed(delta) else { return };
        let result = self.editor.move_clip(sel.track, sel.index, to);
        self.report(result, "Clip moved");
    }

    pub fn trim_selected(&mut self, start: f64, end: f64) {
        let Some(sel) = self.editor.selection() else {
            self.status_message = EditError::NothingSelected.to_string();
            return;
        };
        let result = self.editor.trim_clip(sel.track, sel.index, start, end);
        if self.report(result, "Clip trimmed").is_none() {
            // Reload the draft from the unchanged clip.
            self.trim_draft = None;
        }
    }

    pub fn add_silence(&mut self) {
        let result = self.editor.add_silence(self.silence_seconds);
        let msg = format!("Added {:.1}s of silence", self.silence_seconds);
        self.report(result, &msg);
    }

    pub fn clear_timeline(&mut self) {
        self.editor.reset();
        self.clock.reset();
        self.timeline_scroll = 0.0;
        self.status_message = "Timeline cleared".to_string();
    }

    // ---- Playback ----

    pub fn toggle_play(&mut self) {
        if self.clock.is_paused() {
            self.clock
                .play_from(self.editor.playhead(), self.editor.total_duration());
        } else {
            self.clock.pause();
        }
    }

    pub fn seek(&mut self, time: f64) {
        self.editor.set_playhead(time);
        self.clock.set_time(self.editor.playhead());
    }

    pub fn seek_relative(&mut self, delta: f64) {
        self.seek(self.editor.playhead() + delta);
    }

    fn update_playback(&mut self, ctx: &egui::Context) {
        if self.clock.is_paused() {
            return;
        }
        let time = self.clock.tick(self.editor.total_duration());
        self.editor.set_playhead(time);
        if self.timeline_viewport > 0.0 {
            self.timeline_scroll =
                self.mapper
                    .auto_scroll(self.timeline_scroll, self.timeline_viewport, time);
        }
        ctx.request_repaint_after(Duration::from_millis(30));
    }

    // ---- Jobs ----

    /// Queue a preview or export render of the current timeline.
    pub fn start_render(&mut self, target: RenderTarget) {
        let input = match self.editor.composition(&self.composition, target, |p| {
            self.clip_has_audio(p)
        }) {
            Ok(input) => input,
            Err(e) => {
                self.status_message = e.to_string();
                return;
            }
        };

        let id = JobQueue::new_id();
        let (kind, output) = match target {
            RenderTarget::Preview => (
                JobKind::Preview,
                self.workspace.previews.join(preview_filename(&id)),
            ),
            RenderTarget::Export => {
                let custom = Some(self.export_name.trim()).filter(|s| !s.is_empty());
                (
                    JobKind::Export,
                    self.workspace
                        .exports
                        .join(export_filename(custom, Local::now(), &id)),
                )
            }
        };

        match build_composition_args(&input, &output) {
            Ok(plan) => {
                self.pending.insert(id.clone(), PendingWork::Render(plan));
                self.queue.lock().enqueue(id, kind, output);
                self.status_message = format!("{} queued", target.name());
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    /// Start the next queued job on the runtime.
    pub fn process_queue(&mut self) {
        let Some(id) = self.queue.lock().start_next() else {
            return;
        };
        let Some(work) = self.pending.remove(&id) else {
            self.queue.lock().fail(&id, "job has nothing to run".to_string());
            return;
        };
        let Some((kind, output)) = self
            .queue
            .lock()
            .get(&id)
            .map(|job| (job.kind, job.output.clone()))
        else {
            return;
        };

        let queue = self.queue.clone();
        let tx = self.events_tx.clone();
        let ffmpeg = self.ffmpeg.clone();
        info!(job = %id, kind = kind.name(), "starting job");

        match work {
            PendingWork::Render(plan) => {
                self.runtime.spawn(async move {
                    queue.lock().update_progress(&id, STAGE_RENDERING, "Rendering");
                    let progress_queue = queue.clone();
                    let progress_id = id.clone();
                    let result = ffmpeg
                        .render(&plan, move |p| {
                            let stage = STAGE_RENDERING + (STAGE_FINALIZING - STAGE_RENDERING) * p;
                            progress_queue.lock().update_progress(&progress_id, stage, "Rendering");
                        })
                        .await;

                    let result = match result {
                        Ok(()) => {
                            let summary = format!("{:.1}s", plan.duration);
                            queue.lock().complete(&id, Some(summary.clone()));
                            Ok(summary)
                        }
                        Err(e) => {
                            let message = format!("{:#}", e);
                            queue.lock().fail(&id, message.clone());
                            Err(message)
                        }
                    };
                    let _ = tx.send(AppEvent::JobFinished { kind, output, result });
                });
            }
            PendingWork::Convert(request) => {
                let converter =
                    SlideConverter::new(ffmpeg, &self.config.browser_path, self.conversion_settings());
                self.runtime.spawn(async move {
                    let progress_queue = queue.clone();
                    let progress_id = id.clone();
                    let result = converter
                        .convert(&request, move |p, message| {
                            progress_queue.lock().update_progress(
                                &progress_id,
                                p.max(STAGE_PREPARING),
                                message,
                            );
                        })
                        .await;

                    if result.success {
                        queue.lock().complete(&id, Some(result.summary()));
                    } else {
                        queue.lock().fail(&id, result.summary());
                    }
                    let _ = tx.send(AppEvent::Converted(result));
                });
            }
        }
    }

    pub fn cancel_jobs(&mut self) {
        let mut queue = self.queue.lock();
        queue.cancel_all();
        self.pending.retain(|id, _| queue.get(id).map(|j| !j.is_finished()).unwrap_or(false));
        drop(queue);
        self.status_message = "Queued jobs cancelled".to_string();
    }

    pub fn clear_finished_jobs(&mut self) {
        self.queue.lock().clear_finished();
    }

    pub fn is_busy(&self) -> bool {
        self.queue.lock().is_busy()
    }

    // ---- Slides ----

    fn conversion_settings(&self) -> ConversionSettings {
        ConversionSettings {
            fps: self.config.slide_fps,
            default_seconds_per_slide: self.config.default_slide_seconds,
            max_slides: self.config.max_slides,
            ..ConversionSettings::default()
        }
    }

    pub fn load_deck(&mut self, path: PathBuf) {
        match std::fs::read_to_string(&path) {
            Ok(html) => {
                let deck = SlideDeck::analyze(&html, self.config.default_slide_seconds);
                info!(path = %path.display(), slides = deck.len(), "loaded slide deck");
                self.status_message = format!(
                    "{} slides, {:.0}s total",
                    deck.len(),
                    deck.total_duration()
                );
                self.slides = SlidesState {
                    html_path: Some(path),
                    html,
                    saved: deck.durations.clone(),
                    include_audio: deck.has_embedded_audio,
                    deck: Some(deck),
                    ..SlidesState::default()
                };
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read deck");
                self.status_message = format!("Cannot read {}: {}", path.display(), e);
            }
        }
    }

    pub fn clear_deck(&mut self) {
        self.slides = SlidesState::default();
    }

    pub fn reset_slide_durations(&mut self) {
        let saved = self.slides.saved.clone();
        if let Some(deck) = self.slides.deck.as_mut() {
            deck.durations = saved;
        }
    }

    /// Write a timestamped copy of the deck with the edited durations.
    pub fn save_deck_copy(&mut self) {
        let (Some(path), Some(deck)) = (&self.slides.html_path, &self.slides.deck) else {
            return;
        };
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "slides".to_string());
        let target = self.workspace.html.join(copy_file_name(&stem, Local::now()));
        let html = rewrite_durations(&self.slides.html, &deck.durations);

        match std::fs::write(&target, html) {
            Ok(()) => {
                info!(path = %target.display(), "saved deck copy");
                self.status_message = format!("Saved {}", target.display());
                self.refresh_storage();
            }
            Err(e) => self.status_message = format!("Cannot save copy: {}", e),
        }
    }

    pub fn start_conversion(&mut self) {
        let (Some(html_path), Some(deck)) = (&self.slides.html_path, &self.slides.deck) else {
            self.status_message = "Open an HTML deck first".to_string();
            return;
        };
        let custom: Durations = deck.durations.iter().copied().enumerate().collect();
        let id = JobQueue::new_id();
        let output = self.workspace.slides.join(conversion_filename(&id));
        let request = ConversionRequest {
            html_path: html_path.clone(),
            output: output.clone(),
            custom_durations: Some(custom),
            external_audio: self.slides.external_audio.clone(),
            include_audio: self.slides.include_audio,
        };
        self.slides.result = None;
        self.pending.insert(id.clone(), PendingWork::Convert(request));
        self.queue.lock().enqueue(id, JobKind::SlideConversion, output);
        self.status_message = "Conversion queued".to_string();
    }

    // ---- Storage ----

    pub fn refresh_storage(&mut self) {
        self.storage = self.workspace.storage_info();
        self.exports = self.workspace.list_exports().unwrap_or_else(|e| {
            warn!(error = %e, "cannot list exports");
            Vec::new()
        });
    }

    pub fn cleanup_previews(&mut self) {
        match self.workspace.cleanup(Duration::from_secs(self.config.preview_max_age_hours * 3600)) {
            Ok(n) => self.status_message = format!("Removed {} old preview(s)", n),
            Err(e) => self.status_message = format!("Cleanup failed: {}", e),
        }
        self.refresh_storage();
    }

    pub fn open_path(&mut self, path: &Path) {
        if let Err(e) = open::that(path) {
            warn!(path = %path.display(), error = %e, "cannot open file");
            self.status_message = format!("Cannot open {}: {}", path.display(), e);
        }
    }

    pub fn save_settings(&mut self) {
        self.config.pixels_per_second = self.mapper.pixels_per_second;
        let result: Result<PathBuf> = AppConfig::config_path()
            .ok_or_else(|| anyhow::anyhow!("no config directory on this platform"))
            .and_then(|path| self.config.save_to(&path).map(|_| path));
        match result {
            Ok(path) => self.status_message = format!("Settings saved to {}", path.display()),
            Err(e) => self.status_message = format!("Cannot save settings: {:#}", e),
        }
    }

    /// Handle keyboard shortcuts
    pub fn handle_input(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.add_dropped(dropped);
        }

        if self.tab != Tab::Editor || ctx.wants_keyboard_input() {
            return;
        }

        ctx.input(|i| {
            let cmd = i.modifiers.command;

            // Ctrl+Z undo, Ctrl+Y or Ctrl+Shift+Z redo
            if cmd && i.key_pressed(egui::Key::Z) {
                if i.modifiers.shift {
                    self.redo();
                } else {
                    self.undo();
                }
            }
            if cmd && i.key_pressed(egui::Key::Y) {
                self.redo();
            }

            if i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace) {
                self.delete_selected();
            }
            if !cmd && i.key_pressed(egui::Key::S) {
                self.split_selected();
            }
            if i.key_pressed(egui::Key::Space) {
                self.toggle_play();
            }
            if i.key_pressed(egui::Key::Escape) {
                self.editor.clear_selection();
            }

            if i.key_pressed(egui::Key::ArrowLeft) {
                self.seek_relative(-1.0);
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                self.seek_relative(1.0);
            }
            if i.key_pressed(egui::Key::Home) {
                self.seek(0.0);
            }
            if i.key_pressed(egui::Key::End) {
                self.seek(self.editor.total_duration());
            }
        });
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        self.handle_input(ctx);
        self.update_playback(ctx);
        self.process_queue();

        crate::ui::render_main_window(self, ctx);

        // Background work reports through the queue and the event channel.
        if self.pending_probes > 0 || self.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
