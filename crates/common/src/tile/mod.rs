// Ordered tile descriptors and the concatenated whole-document view.
//
// Order and content are owned separately: nothing here checks that an id in
// the order has content. Callers that drop an id must also delete its content.

use serde::{Deserialize, Serialize};

use crate::types::TileEntry;

/// Separator between tile contents in the concatenated view.
pub const TILE_SEPARATOR: &str = "\n\n";

/// Join tile contents in order. Empty contents still contribute separators.
pub fn concatenate<I, S>(contents: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (index, content) in contents.into_iter().enumerate() {
        if index > 0 {
            out.push_str(TILE_SEPARATOR);
        }
        out.push_str(content.as_ref());
    }
    out
}

/// Where a dragged tile lands relative to the tile it was dropped on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DropPlacement {
    Before,
    After,
}

impl DropPlacement {
    /// Above the target's vertical midpoint inserts before it, otherwise after.
    pub fn from_pointer(pointer_y: f64, target_top: f64, target_height: f64) -> Self {
        if pointer_y < target_top + target_height / 2.0 {
            Self::Before
        } else {
            Self::After
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileSequencer {
    order: Vec<TileEntry>,
}

impl TileSequencer {
    pub fn new(order: Vec<TileEntry>) -> Self {
        Self { order }
    }

    pub fn entries(&self) -> &[TileEntry] {
        &self.order
    }

    pub fn into_entries(self) -> Vec<TileEntry> {
        self.order
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|entry| entry.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|entry| entry.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&TileEntry> {
        self.order.iter().find(|entry| entry.id == id)
    }

    /// Replace the order wholesale.
    pub fn reorder(&mut self, order: Vec<TileEntry>) {
        self.order = order;
    }

    pub fn push(&mut self, entry: TileEntry) {
        self.order.push(entry);
    }

    pub fn remove(&mut self, id: &str) -> Option<TileEntry> {
        let index = self.position(id)?;
        Some(self.order.remove(index))
    }

    /// Returns false when `id` is not in the order.
    pub fn rename(&mut self, id: &str, title: impl Into<String>) -> bool {
        match self.order.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Move `dragged` next to `target`. Returns false and leaves the order
    /// untouched when either id is unknown.
    pub fn move_tile(&mut self, dragged: &str, target: &str, placement: DropPlacement) -> bool {
        if self.position(target).is_none() {
            return false;
        }
        if dragged == target {
            return self.position(dragged).is_some();
        }
        let Some(entry) = self.remove(dragged) else {
            return false;
        };
        let Some(target_index) = self.position(target) else {
            self.order.push(entry);
            return false;
        };
        let index = match placement {
            DropPlacement::Before => target_index,
            DropPlacement::After => target_index + 1,
        };
        self.order.insert(index, entry);
        true
    }

    /// Concatenate tile contents in order, fetching each with `fetch`.
    pub fn concatenate<F>(&self, mut fetch: F) -> String
    where
        F: FnMut(&TileEntry) -> String,
    {
        concatenate(self.order.iter().map(|entry| fetch(entry)))
    }
}
