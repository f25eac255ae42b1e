// Per-story tile storage: the order record in `tiles/tiles.json` and one
// `tiles/<id>.md` per tile.

use std::fs;
use std::path::{Path, PathBuf};

use storyloom_common::path::{safe_name, validate_name};
use storyloom_common::tile::TileSequencer;
use storyloom_common::types::{Tile, TileEntry};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ensure_story_structure, io_error, Result, StoreError, TILES_DIR, TILES_META_FILE};

const TILE_EXT: &str = "md";

#[derive(Debug, Clone)]
pub struct TileStore {
    story_dir: PathBuf,
}

impl TileStore {
    pub fn new(story_dir: impl Into<PathBuf>) -> Self {
        Self { story_dir: story_dir.into() }
    }

    fn tiles_dir(&self) -> PathBuf {
        self.story_dir.join(TILES_DIR)
    }

    fn meta_path(&self) -> PathBuf {
        self.tiles_dir().join(TILES_META_FILE)
    }

    fn content_path(&self, id: &str) -> Result<PathBuf> {
        validate_name(id)?;
        Ok(self.tiles_dir().join(format!("{id}.{TILE_EXT}")))
    }

    fn story_label(&self) -> String {
        self.story_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn require_story(&self) -> Result<()> {
        if self.story_dir.is_dir() {
            Ok(())
        } else {
            Err(StoreError::NotFound(self.story_label()))
        }
    }

    /// The stored order. A missing or unreadable record is an empty order.
    pub fn list(&self) -> Result<Vec<TileEntry>> {
        self.require_story()?;
        Ok(self.read_meta())
    }

    pub fn sequencer(&self) -> Result<TileSequencer> {
        self.list().map(TileSequencer::new)
    }

    fn read_meta(&self) -> Vec<TileEntry> {
        let path = self.meta_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "tile order unreadable, treating as empty");
                return Vec::new();
            }
        };
        if contents.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "tile order corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    fn write_meta(&self, entries: &[TileEntry]) -> Result<()> {
        let dir = self.tiles_dir();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        let path = self.meta_path();
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&path, contents).map_err(io_error(&path))
    }

    /// Create a tile with a fresh id. Creates the story structure when the
    /// story does not exist yet.
    pub fn create(&self, title: &str, content: &str) -> Result<TileEntry> {
        if !self.story_dir.is_dir() {
            fs::create_dir_all(&self.story_dir).map_err(io_error(&self.story_dir))?;
            ensure_story_structure(&self.story_dir)?;
        }

        let mut entries = self.read_meta();
        let entry = TileEntry::new(Uuid::new_v4().to_string(), title);
        write_content(&self.content_path(&entry.id)?, content)?;
        entries.push(entry.clone());
        self.write_meta(&entries)?;

        info!(story = %self.story_label(), tile_id = %entry.id, "tile created");
        Ok(entry)
    }

    /// A tile with its content. Unknown ids load with an empty title and
    /// missing content files load as empty.
    pub fn get(&self, id: &str) -> Result<Tile> {
        self.require_story()?;
        let path = self.content_path(id)?;
        let title = self
            .read_meta()
            .into_iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.title)
            .unwrap_or_default();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(error) => return Err(io_error(&path)(error)),
        };
        Ok(Tile { id: id.to_string(), title, content })
    }

    pub fn content(&self, id: &str) -> Result<String> {
        self.get(id).map(|tile| tile.content)
    }

    pub fn save(&self, id: &str, content: &str) -> Result<()> {
        self.require_story()?;
        write_content(&self.content_path(id)?, content)?;
        debug!(story = %self.story_label(), tile_id = %id, bytes = content.len(), "tile saved");
        Ok(())
    }

    /// Replace the order wholesale. Ids are sanitised; content is not checked.
    pub fn reorder(&self, order: Vec<TileEntry>) -> Result<Vec<TileEntry>> {
        self.require_story()?;
        let normalized = order
            .into_iter()
            .map(|entry| -> Result<TileEntry> {
                Ok(TileEntry::new(safe_name(&entry.id)?, entry.title))
            })
            .collect::<Result<Vec<_>>>()?;
        self.write_meta(&normalized)?;
        debug!(story = %self.story_label(), tiles = normalized.len(), "tile order saved");
        Ok(normalized)
    }

    /// Returns false when the id is not in the order.
    pub fn rename(&self, id: &str, title: &str) -> Result<bool> {
        let mut sequencer = self.sequencer()?;
        if !sequencer.rename(id, title) {
            return Ok(false);
        }
        self.write_meta(sequencer.entries())?;
        Ok(true)
    }

    /// Remove the order entry and the content file together.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.content_path(id)?;
        let mut sequencer = self.sequencer()?;
        sequencer.remove(id);
        self.write_meta(sequencer.entries())?;
        if path.exists() {
            fs::remove_file(&path).map_err(io_error(&path))?;
        }
        info!(story = %self.story_label(), tile_id = %id, "tile deleted");
        Ok(())
    }

    /// Every tile's content in order, joined by blank lines.
    pub fn concatenate(&self) -> Result<String> {
        let sequencer = self.sequencer()?;
        let mut contents = Vec::with_capacity(sequencer.len());
        for id in sequencer.ids() {
            contents.push(self.content(id)?);
        }
        Ok(storyloom_common::tile::concatenate(contents))
    }
}

fn write_content(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::write(path, content).map_err(io_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoryStore;
    use storyloom_common::path::PathError;
    use tempfile::TempDir;

    fn tiles() -> (TempDir, StoryStore, TileStore) {
        let dir = TempDir::new().unwrap();
        let stories = StoryStore::open(dir.path()).unwrap();
        stories.create("Tale").unwrap();
        let tiles = stories.tiles("Tale").unwrap();
        (dir, stories, tiles)
    }

    // ── CRUD ───────────────────────────────────────────────────────

    #[test]
    fn create_then_get() {
        let (_dir, _stories, tiles) = tiles();
        let entry = tiles.create("Opening", "It was cold.").unwrap();

        assert!(Uuid::parse_str(&entry.id).is_ok());
        assert_eq!(tiles.list().unwrap(), vec![entry.clone()]);

        let tile = tiles.get(&entry.id).unwrap();
        assert_eq!(tile.title, "Opening");
        assert_eq!(tile.content, "It was cold.");
    }

    #[test]
    fn ids_are_unique() {
        let (_dir, _stories, tiles) = tiles();
        let a = tiles.create("", "").unwrap();
        let b = tiles.create("", "").unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn create_builds_a_missing_story() {
        let dir = TempDir::new().unwrap();
        let stories = StoryStore::open(dir.path()).unwrap();
        let tiles = stories.tiles("Fresh").unwrap();

        tiles.create("First", "x").unwrap();

        assert!(stories.exists("Fresh"));
        assert_eq!(stories.load("Fresh").unwrap().highlights, "");
        assert_eq!(tiles.list().unwrap().len(), 1);
    }

    #[test]
    fn unknown_tile_loads_empty() {
        let (_dir, _stories, tiles) = tiles();
        let tile = tiles.get("nothing-here").unwrap();

        assert_eq!(
            tile,
            Tile { id: "nothing-here".into(), title: String::new(), content: String::new() }
        );
    }

    #[test]
    fn traversal_ids_are_rejected() {
        let (_dir, _stories, tiles) = tiles();

        assert!(matches!(tiles.get(".."), Err(StoreError::InvalidName(PathError::Traversal(_)))));
        assert!(matches!(tiles.save("../x", "y"), Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn save_overwrites_content() {
        let (_dir, _stories, tiles) = tiles();
        let entry = tiles.create("T", "old").unwrap();

        tiles.save(&entry.id, "new").unwrap();
        assert_eq!(tiles.content(&entry.id).unwrap(), "new");
    }

    #[test]
    fn rename_and_delete() {
        let (_dir, _stories, tiles) = tiles();
        let keep = tiles.create("Keep", "k").unwrap();
        let gone = tiles.create("Gone", "g").unwrap();

        assert!(tiles.rename(&keep.id, "Kept").unwrap());
        assert!(!tiles.rename("missing", "x").unwrap());

        tiles.delete(&gone.id).unwrap();
        assert_eq!(tiles.list().unwrap(), vec![TileEntry::new(keep.id.clone(), "Kept")]);
        assert!(!tiles.tiles_dir().join(format!("{}.md", gone.id)).exists());
    }

    #[test]
    fn missing_story_is_not_found() {
        let dir = TempDir::new().unwrap();
        let stories = StoryStore::open(dir.path()).unwrap();
        let tiles = stories.tiles("Ghost").unwrap();

        assert!(matches!(tiles.list(), Err(StoreError::NotFound(name)) if name == "Ghost"));
    }

    // ── Order record ───────────────────────────────────────────────

    #[test]
    fn corrupt_order_is_treated_as_empty() {
        let (_dir, _stories, tiles) = tiles();
        fs::write(tiles.meta_path(), "{not json").unwrap();

        assert!(tiles.list().unwrap().is_empty());
    }

    #[test]
    fn order_is_pretty_json_with_id_and_title() {
        let (_dir, _stories, tiles) = tiles();
        let entry = tiles.create("One", "").unwrap();

        let raw = fs::read_to_string(tiles.meta_path()).unwrap();
        assert!(raw.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, serde_json::json!([{ "id": entry.id, "title": "One" }]));
    }

    #[test]
    fn missing_title_field_defaults_to_empty() {
        let (_dir, _stories, tiles) = tiles();
        fs::write(tiles.meta_path(), r#"[{"id":"a"}]"#).unwrap();

        assert_eq!(tiles.list().unwrap(), vec![TileEntry::new("a", "")]);
    }

    #[test]
    fn reorder_sanitises_ids_and_does_not_validate_content() {
        let (_dir, _stories, tiles) = tiles();
        let stored = tiles
            .reorder(vec![TileEntry::new("a/b", "First"), TileEntry::new("ghost", "")])
            .unwrap();

        assert_eq!(stored, vec![TileEntry::new("a-b", "First"), TileEntry::new("ghost", "")]);
        assert_eq!(tiles.list().unwrap(), stored);
    }

    // ── Concatenation ──────────────────────────────────────────────

    #[test]
    fn concatenation_follows_stored_order() {
        let (_dir, _stories, tiles) = tiles();
        let one = tiles.create("1", "A").unwrap();
        let two = tiles.create("2", "B").unwrap();

        assert_eq!(tiles.concatenate().unwrap(), "A\n\nB");

        tiles.reorder(vec![two, one]).unwrap();
        assert_eq!(tiles.concatenate().unwrap(), "B\n\nA");
    }

    #[test]
    fn concatenation_keeps_separators_for_empty_and_missing_tiles() {
        let (_dir, _stories, tiles) = tiles();
        let one = tiles.create("1", "A").unwrap();
        let two = tiles.create("2", "").unwrap();
        tiles.reorder(vec![one, two, TileEntry::new("ghost", "")]).unwrap();

        assert_eq!(tiles.concatenate().unwrap(), "A\n\n\n\n");
    }
}
