// Studio session: one explicit context per open story.
//
// A `StoryContext` is created by `open_story` and dropped by `close_story`.
// It holds the loaded story, the in-memory tile order, the current editor
// view and the active tag filter. Everything the UI shows is recomputed from
// that context on each call; nothing derived is cached.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use storyloom_common::annotate::{count_mentions, EntityIndex};
use storyloom_common::render::{render_preview, renderer_for, MarkdownRenderer};
use storyloom_common::section::summary::EntitySummary;
use storyloom_common::section::{
    compose_section, ensure_section, merge_section, parse_document, MergeError, SectionEdit,
};
use storyloom_common::tag::extract_tags;
use storyloom_common::tile::{concatenate, DropPlacement, TileSequencer};
use storyloom_common::types::{TagColor, TileEntry};
use thiserror::Error;
use tracing::{debug, info};

use crate::autosave::{spawn_autosave, AutosaveHandle};
use crate::config::StudioConfig;
use crate::store::{StoreError, StoryData, StoryStore};

// ── Types ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("nothing is open in the editor")]
    NoView,

    #[error("the full document view is read only")]
    ReadOnlyView,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Entity list ordering.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntitySort {
    /// Case-insensitive by name.
    #[default]
    Alpha,
    /// Most mentioned first, ties by name.
    Count,
}

impl EntitySort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Count => "count",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "alpha" => Some(Self::Alpha),
            "count" => Some(Self::Count),
            _ => None,
        }
    }
}

/// What the editor is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Entity { name: String },
    Tile { id: String },
    /// Concatenated tiles, read only.
    FullDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Content matched what is stored; nothing was written.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityListItem {
    pub name: String,
    /// Whole-word mentions in the manuscript.
    pub mentions: usize,
    pub tags: Vec<String>,
    pub color: Option<TagColor>,
}

/// State for one open story.
#[derive(Debug, Clone)]
pub struct StoryContext {
    story: String,
    data: StoryData,
    tiles: TileSequencer,
    view: Option<View>,
    active_tag: Option<String>,
}

impl StoryContext {
    pub fn story(&self) -> &str {
        &self.story
    }

    pub fn data(&self) -> &StoryData {
        &self.data
    }

    pub fn tiles(&self) -> &TileSequencer {
        &self.tiles
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn active_tag(&self) -> Option<&str> {
        self.active_tag.as_deref()
    }

    pub fn entity_index(&self) -> EntityIndex {
        EntityIndex::from_document(&self.data.highlights)
    }

    /// Select `tag` as the list filter, or clear it when it is already
    /// selected. Returns the new filter.
    pub fn toggle_tag_filter(&mut self, tag: &str) -> Option<&str> {
        let tag = tag.trim().trim_start_matches('#');
        if tag.is_empty() || self.active_tag.as_deref() == Some(tag) {
            self.active_tag = None;
        } else {
            self.active_tag = Some(tag.to_string());
        }
        self.active_tag.as_deref()
    }

    pub fn clear_tag_filter(&mut self) {
        self.active_tag = None;
    }
}

// ── Studio ───────────────────────────────────────────────────────────

pub struct Studio {
    stories: StoryStore,
    config: StudioConfig,
    renderer: Box<dyn MarkdownRenderer>,
}

impl Studio {
    pub fn open(config: StudioConfig) -> Result<Self> {
        let stories = StoryStore::open(config.stories_root())?;
        let renderer = renderer_for(config.render.engine);
        debug!(
            root = %stories.root().display(),
            engine = config.render.engine.as_str(),
            "studio opened"
        );
        Ok(Self { stories, config, renderer })
    }

    /// Open with `root` overriding the configured stories root.
    pub fn with_root(mut config: StudioConfig, root: impl Into<std::path::PathBuf>) -> Result<Self> {
        config.stories_root = Some(root.into());
        Self::open(config)
    }

    pub fn stories(&self) -> &StoryStore {
        &self.stories
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn open_story(&self, name: &str) -> Result<StoryContext> {
        let data = self.stories.load(name)?;
        let tiles = self.stories.tiles(&data.name)?.sequencer()?;
        info!(story = %data.name, tiles = tiles.len(), "story opened");
        Ok(StoryContext {
            story: data.name.clone(),
            data,
            tiles,
            view: None,
            active_tag: None,
        })
    }

    pub fn close_story(&self, ctx: StoryContext) {
        debug!(story = %ctx.story, "story closed");
    }

    /// Re-read the story from disk, keeping the view and tag filter.
    pub fn reload(&self, ctx: &mut StoryContext) -> Result<()> {
        ctx.data = self.stories.load(&ctx.story)?;
        ctx.tiles = self.stories.tiles(&ctx.story)?.sequencer()?;
        Ok(())
    }

    /// Tile contents in order, or the legacy `text.md` when there are no tiles.
    pub fn manuscript(&self, ctx: &StoryContext) -> Result<String> {
        if ctx.tiles.is_empty() {
            return Ok(ctx.data.text.clone());
        }
        let store = self.stories.tiles(&ctx.story)?;
        let mut contents = Vec::with_capacity(ctx.tiles.len());
        for id in ctx.tiles.ids() {
            contents.push(store.content(id)?);
        }
        Ok(concatenate(contents))
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Open an entity for editing. An unknown name opens with an empty body.
    /// Returns the editor content.
    pub fn open_entity(&self, ctx: &mut StoryContext, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MergeError::TitleRequired.into());
        }
        let document = parse_document(&ctx.data.highlights);
        let body = document.find(name).map(|section| section.body.as_str()).unwrap_or_default();
        ctx.view = Some(View::Entity { name: name.to_string() });
        Ok(compose_section(name, body))
    }

    pub fn open_tile(&self, ctx: &mut StoryContext, id: &str) -> Result<String> {
        let tile = self.stories.tiles(&ctx.story)?.get(id)?;
        ctx.view = Some(View::Tile { id: tile.id });
        Ok(tile.content)
    }

    /// Switch to the read-only full document. Returns its markdown.
    pub fn open_full_document(&self, ctx: &mut StoryContext) -> Result<String> {
        let text = self.manuscript(ctx)?;
        ctx.view = Some(View::FullDocument);
        Ok(text)
    }

    /// Persist editor content for the current view.
    ///
    /// Tiles are written as-is. Entity content is merged into the stored
    /// entity document; a changed heading renames the section and the view
    /// follows it.
    pub fn save_editor(&self, ctx: &mut StoryContext, content: &str) -> Result<SaveOutcome> {
        let view = ctx.view.clone().ok_or(SessionError::NoView)?;
        match persist_editor(&self.stories, &ctx.story, &view, content)? {
            Persisted::Skipped => Ok(SaveOutcome::Skipped),
            Persisted::Tile => Ok(SaveOutcome::Saved),
            Persisted::Entity { document, title } => {
                ctx.data.highlights = document;
                ctx.view = Some(View::Entity { name: title });
                Ok(SaveOutcome::Saved)
            }
        }
    }

    /// Debounced saving of the current view's editor content.
    ///
    /// Saves go straight to disk; call `reload` afterwards to see them in
    /// `ctx`. Must be called inside a tokio runtime.
    pub fn autosave(&self, ctx: &StoryContext) -> Result<AutosaveHandle> {
        let mut view = ctx.view.clone().ok_or(SessionError::NoView)?;
        if view == View::FullDocument {
            return Err(SessionError::ReadOnlyView);
        }
        let stories = self.stories.clone();
        let story = ctx.story.clone();
        Ok(spawn_autosave(self.config.autosave_config(), move |content: &str| {
            if let Persisted::Entity { title, .. } = persist_editor(&stories, &story, &view, content)? {
                view = View::Entity { name: title };
            }
            Ok::<(), SessionError>(())
        }))
    }

    /// Add an empty entity section named by the current selection. Returns
    /// false when the entity already exists or the name is blank.
    ///
    /// Runs against the stored document so autosaved edits are kept.
    pub fn make_highlight(&self, ctx: &mut StoryContext, name: &str) -> Result<bool> {
        let existing = self.stories.load(&ctx.story)?.highlights;
        let Some(document) = ensure_section(&existing, name) else {
            ctx.data.highlights = existing;
            return Ok(false);
        };
        self.stories.save_highlights(&ctx.story, &document)?;
        ctx.data.highlights = document;
        info!(story = %ctx.story, title = %name.trim(), "entity added");
        Ok(true)
    }

    // ── Derived views ────────────────────────────────────────────────

    /// Entities narrowed by the active tag filter, in the configured order.
    pub fn entity_list(&self, ctx: &StoryContext) -> Result<Vec<EntityListItem>> {
        self.entity_list_sorted(ctx, self.config.entities.sort)
    }

    pub fn entity_list_sorted(&self, ctx: &StoryContext, sort: EntitySort) -> Result<Vec<EntityListItem>> {
        let index = ctx.entity_index();
        let manuscript = self.manuscript(ctx)?;
        let mut items: Vec<EntityListItem> = index
            .names()
            .filter(|name| index.matches_filter(name, ctx.active_tag()))
            .map(|name| EntityListItem {
                name: name.to_string(),
                mentions: count_mentions(&manuscript, name),
                tags: index.tags_of(name).map(|tags| tags.iter().cloned().collect()).unwrap_or_default(),
                color: index.color_of(name).cloned(),
            })
            .collect();
        items.sort_by(|a, b| match sort {
            EntitySort::Alpha => by_name(a, b),
            EntitySort::Count => b.mentions.cmp(&a.mentions).then_with(|| by_name(a, b)),
        });
        Ok(items)
    }

    /// Every tag in the entity document or the manuscript, sorted.
    pub fn story_tags(&self, ctx: &StoryContext) -> Result<Vec<String>> {
        let mut tags: BTreeSet<String> = extract_tags(&ctx.data.highlights);
        tags.extend(extract_tags(&self.manuscript(ctx)?));
        Ok(tags.into_iter().collect())
    }

    /// Annotated HTML for editor content. The tag filter has no effect here.
    pub fn render_editor_preview(&self, ctx: &StoryContext, content: &str) -> String {
        render_preview(content, self.renderer.as_ref(), &ctx.entity_index())
    }

    pub fn render_full_document(&self, ctx: &StoryContext) -> Result<String> {
        let text = self.manuscript(ctx)?;
        Ok(render_preview(&text, self.renderer.as_ref(), &ctx.entity_index()))
    }

    /// Hover card for an entity. Falls back to the story's first uploaded
    /// image when the entity body has none.
    pub fn entity_summary(&self, ctx: &StoryContext, name: &str) -> Option<EntitySummary> {
        let document = parse_document(&ctx.data.highlights);
        let section = document.find(name.trim())?;
        Some(EntitySummary::from_section(section).with_fallback_image(&ctx.data.images))
    }

    // ── Tiles ────────────────────────────────────────────────────────

    /// Drop `dragged` before or after `target` and persist the new order.
    /// Returns false, writing nothing, when either id is unknown.
    pub fn move_tile(
        &self,
        ctx: &mut StoryContext,
        dragged: &str,
        target: &str,
        placement: DropPlacement,
    ) -> Result<bool> {
        if !ctx.tiles.move_tile(dragged, target, placement) {
            return Ok(false);
        }
        let stored = self.stories.tiles(&ctx.story)?.reorder(ctx.tiles.entries().to_vec())?;
        ctx.tiles.reorder(stored);
        Ok(true)
    }

    pub fn create_tile(&self, ctx: &mut StoryContext, title: &str, content: &str) -> Result<TileEntry> {
        let entry = self.stories.tiles(&ctx.story)?.create(title, content)?;
        ctx.tiles.push(entry.clone());
        Ok(entry)
    }

    /// Delete a tile. Closes the editor if it was showing that tile.
    pub fn delete_tile(&self, ctx: &mut StoryContext, id: &str) -> Result<()> {
        self.stories.tiles(&ctx.story)?.delete(id)?;
        ctx.tiles.remove(id);
        if matches!(&ctx.view, Some(View::Tile { id: open }) if open == id) {
            ctx.view = None;
        }
        Ok(())
    }
}

fn by_name(a: &EntityListItem, b: &EntityListItem) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.name.cmp(&b.name))
}

enum Persisted {
    Skipped,
    Tile,
    Entity { document: String, title: String },
}

/// Write editor content for `view` to disk. Entity merges always run against
/// the document as currently stored.
fn persist_editor(stories: &StoryStore, story: &str, view: &View, content: &str) -> Result<Persisted> {
    match view {
        View::FullDocument => Err(SessionError::ReadOnlyView),
        View::Tile { id } => {
            let tiles = stories.tiles(story)?;
            if tiles.content(id)? == content {
                return Ok(Persisted::Skipped);
            }
            tiles.save(id, content)?;
            Ok(Persisted::Tile)
        }
        View::Entity { name } => {
            let edit = SectionEdit::from_editor(content, Some(name))?;
            let existing = stories.load(story)?.highlights;
            let outcome = merge_section(&existing, &edit)?;
            let Some(document) = outcome.document() else {
                return Ok(Persisted::Skipped);
            };
            stories.save_highlights(story, document)?;
            let title = edit.title.trim().to_string();
            if title != *name {
                info!(story = %story, from = %name, to = %title, "entity renamed");
            }
            Ok(Persisted::Entity { document: document.to_string(), title })
        }
    }
}
