// Filesystem story store.
//
// Layout under the stories root:
//   <story>/highlights.md                  entity document
//   <story>/text.md                        legacy manuscript, read only
//   <story>/images/highlights/<ms>-<file>  uploaded images
//   <story>/tiles/tiles.json               tile order, pretty JSON [{id,title}]
//   <story>/tiles/<id>.md                  tile content

pub mod stories;
pub mod tiles;

use std::fs;
use std::path::{Path, PathBuf};

use storyloom_common::path::PathError;
use thiserror::Error;

pub use stories::{StoryData, StoryStore};
pub use tiles::TileStore;

pub const HIGHLIGHTS_FILE: &str = "highlights.md";
pub const LEGACY_TEXT_FILE: &str = "text.md";
pub const IMAGES_DIR: &str = "images";
pub const HIGHLIGHT_IMAGES_DIR: &str = "highlights";
pub const TILES_DIR: &str = "tiles";
pub const TILES_META_FILE: &str = "tiles.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("story not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid name: {0}")]
    InvalidName(#[from] PathError),

    #[error("invalid file: {0} (only {HIGHLIGHTS_FILE} is writable)")]
    InvalidFile(String),

    #[error("i/o error at `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tile order is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Attach `path` to an I/O error.
pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io { path: path.to_path_buf(), source }
}

/// Create any missing piece of a story's directory structure. Existing files
/// are left untouched.
pub(crate) fn ensure_story_structure(story_dir: &Path) -> Result<()> {
    let images = story_dir.join(IMAGES_DIR).join(HIGHLIGHT_IMAGES_DIR);
    fs::create_dir_all(&images).map_err(io_error(&images))?;

    let highlights = story_dir.join(HIGHLIGHTS_FILE);
    if !highlights.exists() {
        fs::write(&highlights, "").map_err(io_error(&highlights))?;
    }

    let tiles = story_dir.join(TILES_DIR);
    fs::create_dir_all(&tiles).map_err(io_error(&tiles))?;
    let meta = tiles.join(TILES_META_FILE);
    if !meta.exists() {
        fs::write(&meta, "[]").map_err(io_error(&meta))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn structure_is_created_and_existing_files_survive() {
        let dir = TempDir::new().unwrap();
        let story = dir.path().join("Tale");
        fs::create_dir_all(&story).unwrap();
        fs::write(story.join(HIGHLIGHTS_FILE), "## Hero\n\nkept").unwrap();

        ensure_story_structure(&story).unwrap();

        assert_eq!(fs::read_to_string(story.join(HIGHLIGHTS_FILE)).unwrap(), "## Hero\n\nkept");
        assert!(story.join(IMAGES_DIR).join(HIGHLIGHT_IMAGES_DIR).is_dir());
        assert_eq!(
            fs::read_to_string(story.join(TILES_DIR).join(TILES_META_FILE)).unwrap(),
            "[]"
        );
    }

    #[test]
    fn io_error_names_the_path() {
        let error = io_error(Path::new("/nowhere/x.md"))(std::io::Error::other("boom"));

        assert_eq!(error.to_string(), "i/o error at `/nowhere/x.md`: boom");
    }
}
