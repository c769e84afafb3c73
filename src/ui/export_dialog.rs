use crate::project::{AudioSource, CompositionSettings, TRANSITIONS};
use eframe::egui;

/// Window with the composition settings used by preview and export.
pub fn render_export_dialog(
    ctx: &egui::Context,
    settings: &mut CompositionSettings,
    show: &mut bool,
) {
    egui::Window::new("Render Settings")
        .open(show)
        .resizable(false)
        .show(ctx, |ui| {
            egui::Grid::new("export_dialog_grid").show(ui, |ui| {
                ui.label("Transition:");
                let current = TRANSITIONS
                    .iter()
                    .find(|(kind, _)| *kind == settings.crossfade.kind)
                    .map(|(_, name)| *name)
                    .unwrap_or("Custom");
                egui::ComboBox::from_id_salt("transition_kind")
                    .selected_text(current)
                    .show_ui(ui, |ui| {
                        for (kind, name) in TRANSITIONS {
                            if ui
                                .selectable_label(settings.crossfade.kind == *kind, *name)
                                .clicked()
                            {
                                settings.crossfade.kind = kind.to_string();
                            }
                        }
                    });
                ui.end_row();

                ui.label("Crossfade:");
                ui.add(
                    egui::Slider::new(&mut settings.crossfade.duration_s, 0.0..=3.0)
                        .step_by(0.1)
                        .suffix(" s"),
                )
                .on_hover_text("0 cuts hard between clips");
                ui.end_row();

                ui.label("Music fade in:");
                ui.add(egui::Slider::new(&mut settings.music_fade_in, 0.0..=10.0).suffix(" s"));
                ui.end_row();

                ui.label("Music fade out:");
                ui.add(egui::Slider::new(&mut settings.music_fade_out, 0.0..=10.0).suffix(" s"));
                ui.end_row();

                ui.label("Audio:");
                ui.vertical(|ui| {
                    for source in AudioSource::all() {
                        ui.radio_value(&mut settings.audio_source, *source, source.name());
                    }
                });
                ui.end_row();
            });

            ui.separator();

            if ui.button("Reset to Defaults").clicked() {
                *settings = CompositionSettings::default();
            }
        });
}
