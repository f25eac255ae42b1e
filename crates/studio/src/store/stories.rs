use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storyloom_common::path::safe_name;
use tracing::{debug, info};

use super::{
    ensure_story_structure, io_error, Result, StoreError, TileStore, HIGHLIGHTS_FILE,
    HIGHLIGHT_IMAGES_DIR, IMAGES_DIR, LEGACY_TEXT_FILE,
};

/// Everything a story view needs at load time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoryData {
    pub name: String,
    /// Legacy manuscript from `text.md`; empty when absent.
    pub text: String,
    /// Raw entity document.
    pub highlights: String,
    /// Uploaded image paths relative to the story directory, sorted.
    pub images: Vec<String>,
}

/// Stories as directories under one root.
#[derive(Debug, Clone)]
pub struct StoryStore {
    root: PathBuf,
}

impl StoryStore {
    /// Open the store, creating the root directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(io_error(&root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `name` after sanitisation. Does not check existence.
    pub fn story_dir(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(safe_name(name)?))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.story_dir(name).is_ok_and(|dir| dir.is_dir())
    }

    /// Directory for an existing story.
    pub(crate) fn existing_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.story_dir(name)?;
        if !dir.is_dir() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(dir)
    }

    /// Story names, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(io_error(&self.root))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error(&self.root))?;
            let is_dir = entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false);
            if is_dir {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a story and return its stored (sanitised) name.
    pub fn create(&self, name: &str) -> Result<String> {
        let name = safe_name(name)?;
        let dir = self.root.join(&name);
        if dir.exists() {
            return Err(StoreError::AlreadyExists(name));
        }
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        ensure_story_structure(&dir)?;
        info!(story = %name, "story created");
        Ok(name)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<String> {
        let from = self.existing_dir(old)?;
        let new = safe_name(new)?;
        let to = self.root.join(&new);
        if to.exists() {
            return Err(StoreError::AlreadyExists(new));
        }
        fs::rename(&from, &to).map_err(io_error(&from))?;
        info!(from = %old, to = %new, "story renamed");
        Ok(new)
    }

    /// Remove a story and everything under it.
    pub fn delete(&self, name: &str) -> Result<()> {
        let dir = self.existing_dir(name)?;
        fs::remove_dir_all(&dir).map_err(io_error(&dir))?;
        info!(story = %name, "story deleted");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<StoryData> {
        let dir = self.existing_dir(name)?;
        let data = StoryData {
            name: safe_name(name)?,
            text: read_optional(&dir.join(LEGACY_TEXT_FILE))?,
            highlights: read_optional(&dir.join(HIGHLIGHTS_FILE))?,
            images: list_images(&dir)?,
        };
        debug!(story = %data.name, images = data.images.len(), "story loaded");
        Ok(data)
    }

    /// Write a story file. Only the entity document is writable.
    pub fn save_file(&self, name: &str, file: &str, content: &str) -> Result<()> {
        if file != HIGHLIGHTS_FILE {
            return Err(StoreError::InvalidFile(file.to_string()));
        }
        let path = self.existing_dir(name)?.join(file);
        fs::write(&path, content).map_err(io_error(&path))?;
        debug!(story = %name, file, bytes = content.len(), "story file saved");
        Ok(())
    }

    pub fn save_highlights(&self, name: &str, content: &str) -> Result<()> {
        self.save_file(name, HIGHLIGHTS_FILE, content)
    }

    /// Copy an image file into the story and return its relative path.
    pub fn upload_image(&self, name: &str, source: &Path) -> Result<String> {
        let file_name = source
            .file_name()
            .and_then(|file_name| file_name.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = fs::read(source).map_err(io_error(source))?;
        self.store_image(name, &file_name, &bytes)
    }

    /// Store image bytes as `images/highlights/<millis>-<file>`.
    pub fn store_image(&self, name: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.existing_dir(name)?;
        let clean = safe_name(file_name)?;
        let stored = format!("{}-{clean}", chrono::Utc::now().timestamp_millis());

        let images = dir.join(IMAGES_DIR).join(HIGHLIGHT_IMAGES_DIR);
        fs::create_dir_all(&images).map_err(io_error(&images))?;
        let target = images.join(&stored);
        fs::write(&target, bytes).map_err(io_error(&target))?;

        info!(story = %name, file = %stored, "image uploaded");
        Ok(format!("{IMAGES_DIR}/{HIGHLIGHT_IMAGES_DIR}/{stored}"))
    }

    /// Tile storage for a story. The story need not exist yet.
    pub fn tiles(&self, name: &str) -> Result<TileStore> {
        Ok(TileStore::new(self.story_dir(name)?))
    }
}

fn read_optional(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(error) => Err(io_error(path)(error)),
    }
}

fn list_images(story_dir: &Path) -> Result<Vec<String>> {
    let dir = story_dir.join(IMAGES_DIR).join(HIGHLIGHT_IMAGES_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut images = Vec::new();
    for entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
        let entry = entry.map_err(io_error(&dir))?;
        if let Some(file_name) = entry.file_name().to_str() {
            images.push(format!("{IMAGES_DIR}/{HIGHLIGHT_IMAGES_DIR}/{file_name}"));
        }
    }
    images.sort();
    Ok(images)
}
