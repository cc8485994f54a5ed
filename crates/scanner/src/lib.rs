pub mod filter;
pub mod walk;

pub use walk::{MediaEntry, walk_media_dir};
