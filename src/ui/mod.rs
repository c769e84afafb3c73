mod export_dialog;
mod exports_panel;
mod main_window;
mod slides_panel;
mod timeline_widget;

pub use export_dialog::*;
pub use exports_panel::*;
pub use main_window::*;
pub use slides_panel::*;
pub use timeline_widget::*;
