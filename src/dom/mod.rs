pub mod titles;

pub use titles::{TitleExtractor, TILE_SELECTOR};
