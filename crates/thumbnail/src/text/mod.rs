pub mod backend;
pub mod layout;
pub mod title;

pub use backend::{FontBackend, GlyphBackend, font_search_paths, resolve_font};
pub use layout::{FIT_MARGIN, PlacedLine, TextEngine, TextLayout};
pub use title::split_title;
