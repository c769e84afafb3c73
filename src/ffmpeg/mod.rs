mod wrapper;
mod probe;
mod commands;
mod compose;
mod progress;

pub use wrapper::*;
pub use probe::*;
pub use commands::*;
pub use compose::*;
pub use progress::*;
