// Story, tile and file name handling.

mod normalize;

pub use normalize::{safe_name, validate_name, PathError, MAX_NAME_CHARS};
