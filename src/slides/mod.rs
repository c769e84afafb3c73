//! HTML slide decks rendered to MP4.

mod capture;
mod convert;
mod deck;

pub use capture::*;
pub use convert::*;
pub use deck::*;
