// storyloom-common: document model, annotation and tile ordering shared across Storyloom crates

pub mod annotate;
pub mod path;
pub mod render;
pub mod section;
pub mod tag;
pub mod tile;
pub mod types;
