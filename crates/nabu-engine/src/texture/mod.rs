//! 2D textures sampled by the fragment stage.

mod stage;

pub use stage::{RowAlignment, Texture, TextureUpload};
