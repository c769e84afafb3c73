use crate::app::EditorApp;
use crate::jobs::{JobKind, JobStatus};
use crate::project::AUDIO_EXTENSIONS;
use crate::utils::format_clock;
use eframe::egui;
use egui_extras::{Column, TableBuilder};

/// HTML deck → MP4 tab.
pub fn render_slides_panel(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.heading("HTML → MP4");
        if ui.button("Open HTML...").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("HTML", &["html", "htm"])
                .pick_file()
            {
                app.load_deck(path);
            }
        }
        if app.slides.deck.is_some() && ui.button("Close").clicked() {
            app.clear_deck();
        }
    });
    ui.separator();

    let Some(deck) = app.slides.deck.as_ref() else {
        ui.vertical_centered(|ui| {
            ui.add_space(30.0);
            ui.label("Open an HTML slide deck to convert it to video.");
            ui.small("Slide timings are read from SLIDE_CONFIG or SAVED_DURATIONS.");
        });
        return;
    };

    let name = app
        .slides
        .html_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    ui.label(format!(
        "{}: {} slide(s), {} total",
        name,
        deck.len(),
        format_clock(deck.total_duration())
    ));
    if !deck.has_saved_durations {
        ui.small(format!(
            "No saved timings found, using {:.0}s per slide",
            app.config.default_slide_seconds
        ));
    }
    if deck.len() > app.config.max_slides {
        ui.colored_label(
            egui::Color32::YELLOW,
            format!("Only the first {} slides will be rendered", app.config.max_slides),
        );
    }

    ui.add_space(4.0);
    render_duration_table(app, ui);

    ui.horizontal(|ui| {
        if ui.button("Reset durations").clicked() {
            app.reset_slide_durations();
        }
        if ui
            .button("Save copy")
            .on_hover_text("Write a timestamped copy of the deck with these durations")
            .clicked()
        {
            app.save_deck_copy();
        }
    });

    ui.separator();
    render_audio_options(app, ui);
    ui.separator();
    render_conversion(app, ui);
}

fn render_duration_table(app: &mut EditorApp, ui: &mut egui::Ui) {
    let Some(deck) = app.slides.deck.as_mut() else { return };
    let starts = deck.start_times();

    egui::ScrollArea::vertical()
        .max_height(260.0)
        .id_salt("slide_table_scroll")
        .show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto())
                .column(Column::auto())
                .column(Column::remainder())
                .header(18.0, |mut h| {
                    h.col(|ui| {
                        ui.strong("Slide");
                    });
                    h.col(|ui| {
                        ui.strong("Starts");
                    });
                    h.col(|ui| {
                        ui.strong("Duration");
                    });
                })
                .body(|mut body| {
                    for (i, duration) in deck.durations.iter_mut().enumerate() {
                        body.row(20.0, |mut row| {
                            row.col(|ui| {
                                ui.monospace(format!("{:>3}", i + 1));
                            });
                            row.col(|ui| {
                                ui.monospace(format_clock(starts.get(i).copied().unwrap_or(0.0)));
                            });
                            row.col(|ui| {
                                ui.add(
                                    egui::DragValue::new(duration)
                                        .range(0.5..=600.0)
                                        .speed(0.1)
                                        .suffix(" s"),
                                );
                            });
                        });
                    }
                });
        });
}

fn render_audio_options(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.label("Audio");
    ui.horizontal(|ui| {
        match &app.slides.external_audio {
            Some(path) => {
                ui.label(
                    path.file_name()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default(),
                )
                .on_hover_text(path.display().to_string());
                if ui.small_button("x").on_hover_text("Remove audio file").clicked() {
                    app.slides.external_audio = None;
                }
            }
            None => {
                ui.label("No audio file");
            }
        }
        if ui.button("Choose audio...").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("Audio", AUDIO_EXTENSIONS)
                .pick_file()
            {
                app.slides.external_audio = Some(path);
            }
        }
    });

    let has_embedded = app
        .slides
        .deck
        .as_ref()
        .map(|d| d.has_embedded_audio)
        .unwrap_or(false);
    if has_embedded {
        ui.add_enabled(
            app.slides.external_audio.is_none(),
            egui::Checkbox::new(&mut app.slides.include_audio, "Use audio embedded in the deck"),
        );
    }
}

fn render_conversion(app: &mut EditorApp, ui: &mut egui::Ui) {
    let job = app.queue.lock().latest(JobKind::SlideConversion).cloned();
    let running = job.as_ref().map(|j| !j.is_finished()).unwrap_or(false);

    ui.horizontal(|ui| {
        if ui
            .add_enabled(!running, egui::Button::new("Generate MP4"))
            .clicked()
        {
            app.start_conversion();
        }
        if let Some(job) = job.as_ref().filter(|_| running) {
            ui.spinner();
            ui.add(
                egui::ProgressBar::new(job.progress)
                    .text(format!("{} {:.0}%", job.message, job.progress * 100.0))
                    .desired_width(220.0),
            );
            if job.status == JobStatus::Queued && ui.button("Cancel").clicked() {
                app.cancel_jobs();
            }
        }
    });

    let Some(result) = app.slides.result.clone() else { return };
    ui.add_space(4.0);
    if result.success {
        ui.colored_label(egui::Color32::LIGHT_GREEN, result.summary());
        if let Some(path) = result.output_path {
            ui.horizontal(|ui| {
                ui.monospace(path.display().to_string());
                if ui.button("Open").clicked() {
                    app.open_path(&path);
                }
                if let Some(dir) = path.parent() {
                    if ui.button("Show folder").clicked() {
                        app.open_path(dir);
                    }
                }
            });
        }
    } else {
        ui.colored_label(egui::Color32::LIGHT_RED, result.summary());
    }
}
