mod clip;
mod editor;
mod export;
mod history;
mod media;
mod playhead;
mod selection;
mod timeline;

pub use clip::*;
pub use editor::*;
pub use export::*;
pub use history::*;
pub use media::*;
pub use playhead::*;
pub use selection::*;
pub use timeline::*;
