use crate::app::{EditorApp, Tab};
use crate::jobs::JobStatus;
use crate::project::{AudioSource, RenderTarget, TrackKind, AUDIO_EXTENSIONS, MAX_VOLUME_PERCENT, VIDEO_EXTENSIONS};
use crate::ui::{render_export_dialog, render_exports_panel, render_slides_panel, TimelineWidget};
use crate::utils::{format_clock, format_precise, format_size};
use eframe::egui;
use std::path::PathBuf;

fn pick_media(track: TrackKind) -> Option<Vec<PathBuf>> {
    let dialog = rfd::FileDialog::new();
    let dialog = match track {
        TrackKind::Video => dialog.add_filter("Video", VIDEO_EXTENSIONS),
        _ => dialog
            .add_filter("Audio", AUDIO_EXTENSIONS)
            .add_filter("Video", VIDEO_EXTENSIONS),
    };
    let dialog = dialog.add_filter("All Files", &["*"]);
    match track {
        TrackKind::Music => dialog.pick_file().map(|p| vec![p]),
        _ => dialog.pick_files(),
    }
}

pub fn render_main_window(app: &mut EditorApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        render_menu_bar(app, ui);
        ui.horizontal(|ui| {
            ui.selectable_value(&mut app.tab, Tab::Editor, "Editor");
            ui.selectable_value(&mut app.tab, Tab::Slides, "HTML → MP4");
            if ui.selectable_value(&mut app.tab, Tab::Exports, "Exports").clicked() {
                app.refresh_storage();
            }
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        render_status_bar(app, ui);
    });

    match app.tab {
        Tab::Editor => render_editor_tab(app, ctx),
        Tab::Slides => {
            egui::CentralPanel::default().show(ctx, |ui| render_slides_panel(app, ui));
        }
        Tab::Exports => {
            egui::CentralPanel::default().show(ctx, |ui| render_exports_panel(app, ui));
        }
    }

    let mut show = app.show_export_settings;
    render_export_dialog(ctx, &mut app.composition, &mut show);
    app.show_export_settings = show;
}

fn render_editor_tab(app: &mut EditorApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("export_bar").show(ctx, |ui| {
        render_export_bar(app, ui);
    });

    egui::TopBottomPanel::bottom("timeline_panel")
        .resizable(true)
        .min_height(120.0)
        .default_height(200.0)
        .show(ctx, |ui| {
            render_timeline_panel(app, ui);
        });

    egui::SidePanel::left("media_panel")
        .resizable(true)
        .default_width(220.0)
        .min_width(160.0)
        .max_width(360.0)
        .show(ctx, |ui| {
            render_media_panel(app, ui);
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        render_toolbar(app, ui);
        ui.separator();
        render_transport(app, ui);
        ui.separator();
        render_volumes(app, ui);
        ui.separator();
        render_clip_inspector(app, ui);
    });
}

fn render_menu_bar(app: &mut EditorApp, ui: &mut egui::Ui) {
    egui::menu::bar(ui, |ui| {
        ui.menu_button("File", |ui| {
            for track in TrackKind::all() {
                if ui.button(format!("Add {}...", track.label())).clicked() {
                    if let Some(paths) = pick_media(*track) {
                        app.add_files(paths, *track);
                    }
                    ui.close_menu();
                }
            }
            ui.separator();
            if ui.button("Open HTML Deck...").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("HTML", &["html", "htm"])
                    .pick_file()
                {
                    app.load_deck(path);
                    app.tab = Tab::Slides;
                }
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Save Settings").clicked() {
                app.save_settings();
                ui.close_menu();
            }
            if ui.button("Exit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.menu_button("Edit", |ui| {
            if ui
                .add_enabled(app.editor.can_undo(), egui::Button::new("Undo (Ctrl+Z)"))
                .clicked()
            {
                app.undo();
                ui.close_menu();
            }
            if ui
                .add_enabled(app.editor.can_redo(), egui::Button::new("Redo (Ctrl+Y)"))
                .clicked()
            {
                app.redo();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Split at Playhead (S)").clicked() {
                app.split_selected();
                ui.close_menu();
            }
            if ui
                .add_enabled(app.editor.selection().is_some(), egui::Button::new("Delete Clip (Del)"))
                .clicked()
            {
                app.delete_selected();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Clear Timeline").clicked() {
                app.clear_timeline();
                ui.close_menu();
            }
        });

        ui.menu_button("Render", |ui| {
            if ui.button("Settings...").clicked() {
                app.show_export_settings = true;
                ui.close_menu();
            }
            if ui.button("Clean Old Previews").clicked() {
                app.cleanup_previews();
                ui.close_menu();
            }
        });
    });
}

fn render_status_bar(app: &EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label(app.status_message.as_str());

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let (finished, total) = app.queue.lock().counts();
            if total > 0 {
                ui.label(format!("jobs {}/{}", finished, total));
                ui.separator();
            }
            ui.label(format!("{} clip(s)", app.editor.timeline().clip_count()));
            ui.separator();
            ui.label(format!(
                "undo {} / redo {}",
                app.editor.history().undo_len(),
                app.editor.history().redo_len()
            ));
        });
    });
}

fn render_toolbar(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        let undo_hint = app
            .editor
            .undo_label()
            .map(|l| format!("Undo: {}", l))
            .unwrap_or_else(|| "Nothing to undo".to_string());
        if ui
            .add_enabled(app.editor.can_undo(), egui::Button::new("Undo"))
            .on_hover_text(undo_hint)
            .clicked()
        {
            app.undo();
        }

        let redo_hint = app
            .editor
            .redo_label()
            .map(|l| format!("Redo: {}", l))
            .unwrap_or_else(|| "Nothing to redo".to_string());
        if ui
            .add_enabled(app.editor.can_redo(), egui::Button::new("Redo"))
            .on_hover_text(redo_hint)
            .clicked()
        {
            app.redo();
        }

        ui.separator();

        if ui
            .button("Split")
            .on_hover_text("Split the selected track at the playhead (S)")
            .clicked()
        {
            app.split_selected();
        }
        let has_selection = app.editor.selection().is_some();
        if ui
            .add_enabled(has_selection, egui::Button::new("Delete"))
            .on_hover_text("Remove the selected clip (Del)")
            .clicked()
        {
            app.delete_selected();
        }

        ui.separator();

        ui.add(
            egui::DragValue::new(&mut app.silence_seconds)
                .range(0.1..=60.0)
                .speed(0.1)
                .suffix(" s"),
        );
        if ui.button("+ Silence").on_hover_text("Append silence to the speech track").clicked() {
            app.add_silence();
        }
    });
}

fn render_transport(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        let total = app.editor.total_duration();

        if ui.button("|<").on_hover_text("Start (Home)").clicked() {
            app.seek(0.0);
        }
        if ui.button("<").on_hover_text("Back 1s (Left)").clicked() {
            app.seek_relative(-1.0);
        }
        let label = if app.clock.is_paused() { ">" } else { "||" };
        if ui.button(label).on_hover_text("Play/Pause (Space)").clicked() {
            app.toggle_play();
        }
        if ui.button(">").on_hover_text("Forward 1s (Right)").clicked() {
            app.seek_relative(1.0);
        }
        if ui.button(">|").on_hover_text("End (End)").clicked() {
            app.seek(total);
        }

        ui.separator();

        ui.monospace(format!(
            "{} / {}",
            format_precise(app.editor.playhead()),
            format_clock(total)
        ));
    });
}

fn render_volumes(app: &mut EditorApp, ui: &mut egui::Ui) {
    egui::Grid::new("volume_grid").show(ui, |ui| {
        ui.label("Speech volume:");
        let mut speech = app.editor.volumes.speech_percent;
        if ui
            .add(egui::Slider::new(&mut speech, 0..=MAX_VOLUME_PERCENT).suffix("%"))
            .changed()
        {
            app.editor.volumes.set_speech(speech);
        }
        ui.end_row();

        ui.label("Music volume:");
        let mut music = app.editor.volumes.music_percent;
        if ui
            .add(egui::Slider::new(&mut music, 0..=MAX_VOLUME_PERCENT).suffix("%"))
            .changed()
        {
            app.editor.volumes.set_music(music);
        }
        ui.end_row();
    });
}

fn render_clip_inspector(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.heading("Clip");

    let Some(selected) = app.editor.selection() else {
        ui.label("Click a clip on the timeline to select it.");
        return;
    };
    let Some(clip) = app.editor.timeline().clip(selected.track, selected.index).cloned() else {
        return;
    };
    let track_len = app.editor.timeline().track(selected.track).len();

    ui.label(format!(
        "{} on {} (#{})",
        clip.display_name(),
        selected.track.label(),
        selected.index + 1
    ));
    ui.label(format!(
        "Starts at {}, length {} of {}",
        format_precise(app.editor.timeline().clip_start(selected.track, selected.index)),
        format_precise(clip.trimmed_duration()),
        format_precise(clip.duration)
    ));

    ui.horizontal(|ui| {
        if ui
            .add_enabled(selected.index > 0, egui::Button::new("Move left"))
            .clicked()
        {
            app.nudge_selected(-1);
        }
        if ui
            .add_enabled(selected.index + 1 < track_len, egui::Button::new("Move right"))
            .clicked()
        {
            app.nudge_selected(1);
        }
    });

    if clip.is_silence() {
        return;
    }

    let mut apply = None;
    if let Some(draft) = app.trim_draft() {
        egui::Grid::new("trim_grid").show(ui, |ui| {
            ui.label("Cut from start:");
            ui.add(
                egui::DragValue::new(&mut draft.start)
                    .range(0.0..=clip.duration)
                    .speed(0.05)
                    .suffix(" s"),
            );
            ui.end_row();

            ui.label("Cut from end:");
            ui.add(
                egui::DragValue::new(&mut draft.end)
                    .range(0.0..=clip.duration)
                    .speed(0.05)
                    .suffix(" s"),
            );
            ui.end_row();
        });
        let changed = draft.start != clip.trim_start || draft.end != clip.trim_end;
        if ui.add_enabled(changed, egui::Button::new("Apply trim")).clicked() {
            apply = Some((draft.start, draft.end));
        }
    }
    if let Some((start, end)) = apply {
        app.trim_selected(start, end);
    }
}

fn render_media_panel(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.heading("Media");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button("+").on_hover_text("Add video clips").clicked() {
                if let Some(paths) = pick_media(TrackKind::Video) {
                    app.add_files(paths, TrackKind::Video);
                }
            }
        });
    });

    ui.separator();

    if app.media.is_empty() {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.label("No media loaded");
            ui.small("Drag & drop or File > Add");
        });
        return;
    }

    let mut files: Vec<_> = app.media.values().collect();
    files.sort_by_key(|f| f.filename());
    let mut add: Option<(PathBuf, TrackKind)> = None;

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .id_salt("media_list_scroll")
        .show(ui, |ui| {
            for file in files {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(file.filename()).small())
                        .on_hover_text(format!(
                            "{}\n{} | {} | {} | audio: {}",
                            file.path.display(),
                            file.resolution_string(),
                            format_clock(file.duration()),
                            format_size(file.info.file_size),
                            if file.has_audio() { "yes" } else { "no" },
                        ));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        for track in TrackKind::all().iter().rev() {
                            let short = &track.label()[..1];
                            if ui
                                .small_button(short)
                                .on_hover_text(format!("Add to {}", track.label()))
                                .clicked()
                            {
                                add = Some((file.path.clone(), *track));
                            }
                        }
                    });
                });
            }
        });

    if let Some((path, track)) = add {
        app.add_media_clip(&path, track);
    }
}

fn render_timeline_panel(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Zoom:");
        let mut pps = app.mapper.pixels_per_second;
        if ui
            .add(
                egui::Slider::new(&mut pps, crate::project::MIN_ZOOM..=crate::project::MAX_ZOOM)
                    .logarithmic(true)
                    .suffix(" px/s"),
            )
            .changed()
        {
            app.mapper.set_zoom(pps);
        }
    });

    let response = TimelineWidget::new(app.editor.timeline(), app.mapper)
        .playhead(app.editor.playhead())
        .selection(app.editor.selection())
        .scroll(app.timeline_scroll)
        .show(ui);

    app.timeline_viewport = response.viewport_width;
    if let Some(clip) = response.select {
        app.select_clip(clip);
    }
    if response.clear_selection {
        app.editor.clear_selection();
    }
    if let Some(time) = response.seek_to {
        app.seek(time);
    }
    if let Some(track) = response.split {
        app.split_track(track);
    }
    if let Some(clip) = response.remove {
        app.remove_clip(clip);
    }
    if let Some(zoom) = response.zoom_changed {
        app.mapper.set_zoom(zoom);
    }
    if let Some(scroll) = response.scroll_changed {
        app.timeline_scroll = scroll;
    }
    if response.is_scrubbing {
        app.timeline_scroll = app.mapper.auto_scroll(
            app.timeline_scroll,
            response.viewport_width,
            app.editor.playhead(),
        );
        ui.ctx().request_repaint();
    }
}

fn render_export_bar(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Audio:");
        for source in AudioSource::all() {
            ui.radio_value(&mut app.composition.audio_source, *source, source.name());
        }

        ui.separator();

        ui.label("Name:");
        ui.add(
            egui::TextEdit::singleline(&mut app.export_name)
                .hint_text("optional")
                .desired_width(140.0),
        );

        let has_clips = !app.editor.timeline().is_empty();
        if ui
            .add_enabled(has_clips, egui::Button::new("Preview"))
            .on_hover_text("Render a 720p preview and open it")
            .clicked()
        {
            app.start_render(RenderTarget::Preview);
        }
        if ui
            .add_enabled(has_clips, egui::Button::new("EXPORT"))
            .on_hover_text("Render the timeline at 1080p")
            .clicked()
        {
            app.start_render(RenderTarget::Export);
        }
        if ui.button("Settings...").clicked() {
            app.show_export_settings = true;
        }

        // Progress of the running or most recent render
        let latest = {
            let queue = app.queue.lock();
            queue
                .jobs
                .iter()
                .rev()
                .find(|j| j.kind != crate::jobs::JobKind::SlideConversion)
                .cloned()
        };
        if let Some(job) = latest {
            ui.separator();
            match &job.status {
                JobStatus::Queued | JobStatus::Processing => {
                    ui.spinner();
                    ui.add(
                        egui::ProgressBar::new(job.progress)
                            .text(format!("{} {:.0}%", job.message, job.progress * 100.0))
                            .desired_width(150.0),
                    );
                    if ui.button("Stop All").on_hover_text("Cancel queued jobs").clicked() {
                        app.cancel_jobs();
                    }
                }
                JobStatus::Completed => {
                    ui.label(format!("{} done", job.kind.name()));
                    if ui.button("Open").clicked() {
                        app.open_path(&job.output);
                    }
                    if ui.button("Clear").clicked() {
                        app.clear_finished_jobs();
                    }
                }
                JobStatus::Failed(e) => {
                    ui.colored_label(egui::Color32::LIGHT_RED, format!("{} failed", job.kind.name()))
                        .on_hover_text(e.as_str());
                    if ui.button("Clear").clicked() {
                        app.clear_finished_jobs();
                    }
                }
            }
        }
    });
}
