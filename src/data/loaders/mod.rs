//! Built-in item loaders.

mod image_loader;
mod npy_loader;
mod text_loader;

pub use image_loader::ImageLoader;
pub use npy_loader::NpyLoader;
pub use text_loader::TextLoader;
