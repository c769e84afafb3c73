use crate::app::EditorApp;
use crate::jobs::JobStatus;
use eframe::egui;
use egui_extras::{Column, TableBuilder};
use std::path::PathBuf;

pub fn render_exports_panel(app: &mut EditorApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.heading("Exports");
        if ui.button("Refresh").clicked() {
            app.refresh_storage();
        }
        if ui.button("Open folder").clicked() {
            let dir = app.workspace.exports.clone();
            app.open_path(&dir);
        }
    });
    ui.separator();

    render_jobs(app, ui);
    ui.add_space(8.0);

    let mut open: Option<PathBuf> = None;
    if app.exports.is_empty() {
        ui.label("No exports yet.");
    } else {
        ui.push_id("exports_table", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::remainder())
                .column(Column::auto())
                .column(Column::auto())
                .column(Column::auto())
                .header(18.0, |mut h| {
                    h.col(|ui| {
                        ui.strong("File");
                    });
                    h.col(|ui| {
                        ui.strong("Size");
                    });
                    h.col(|ui| {
                        ui.strong("Modified");
                    });
                    h.col(|_| {});
                })
                .body(|mut body| {
                    for entry in &app.exports {
                        body.row(20.0, |mut row| {
                            row.col(|ui| {
                                ui.label(entry.filename.as_str());
                            });
                            row.col(|ui| {
                                ui.monospace(format!("{:.2} MB", entry.size_mb));
                            });
                            row.col(|ui| {
                                ui.monospace(entry.modified.format("%Y-%m-%d %H:%M").to_string());
                            });
                            row.col(|ui| {
                                if ui.small_button("Open").clicked() {
                                    open = Some(entry.path.clone());
                                }
                            });
                        });
                    }
                });
        });
    }
    if let Some(path) = open {
        app.open_path(&path);
    }

    ui.add_space(8.0);
    ui.separator();
    ui.horizontal(|ui| {
        ui.strong("Storage");
        ui.monospace(app.workspace.root.display().to_string());
    });
    egui::Grid::new("storage_grid").striped(true).show(ui, |ui| {
        for usage in &app.storage {
            ui.label(usage.name);
            ui.label(format!("{} file(s)", usage.files));
            ui.monospace(format!("{:.2} MB", usage.size_mb));
            ui.end_row();
        }
    });
    if ui
        .button("Clean old previews")
        .on_hover_text(format!(
            "Delete previews older than {}h",
            app.config.preview_max_age_hours
        ))
        .clicked()
    {
        app.cleanup_previews();
    }
}

fn render_jobs(app: &mut EditorApp, ui: &mut egui::Ui) {
    let jobs = app.queue.lock().jobs.clone();
    if jobs.is_empty() {
        return;
    }

    ui.horizontal(|ui| {
        ui.strong("Jobs");
        if ui.small_button("Clear finished").clicked() {
            app.clear_finished_jobs();
        }
    });

    let mut open: Option<PathBuf> = None;
    ui.push_id("jobs_table", |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::remainder())
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .body(|mut body| {
                for job in jobs.iter().rev() {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            ui.label(job.description());
                        });
                        row.col(|ui| match &job.status {
                            JobStatus::Processing => {
                                ui.add(
                                    egui::ProgressBar::new(job.progress)
                                        .show_percentage()
                                        .desired_width(120.0),
                                );
                            }
                            JobStatus::Failed(e) => {
                                ui.colored_label(egui::Color32::LIGHT_RED, job.status_text())
                                    .on_hover_text(e.as_str());
                            }
                            _ => {
                                ui.label(job.status_text());
                            }
                        });
                        row.col(|ui| {
                            let when = job.completed_at.unwrap_or(job.created_at);
                            ui.monospace(when.format("%H:%M:%S").to_string());
                        });
                        row.col(|ui| {
                            if job.status == JobStatus::Completed {
                                let button = ui.small_button("Open");
                                let button = match &job.summary {
                                    Some(summary) => button.on_hover_text(summary.as_str()),
                                    None => button,
                                };
                                if button.clicked() {
                                    open = Some(job.output.clone());
                                }
                            }
                        });
                    });
                }
            });
    });
    if let Some(path) = open {
        app.open_path(&path);
    }
}
