// `storyloom tiles`: list, create, edit and reorder a story's tiles.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use storyloom_common::tile::DropPlacement;
use storyloom_common::types::{Tile, TileEntry};
use storyloom_studio::session::{SaveOutcome, Studio};
use tracing::debug;

use super::{read_content, Context};
use crate::output;

#[derive(Debug, Args)]
pub struct TilesArgs {
    /// Story name.
    story: String,

    #[command(subcommand)]
    action: TilesAction,
}

#[derive(Debug, Subcommand)]
enum TilesAction {
    /// List tiles in order
    Ls,
    /// Append a new tile
    New {
        #[arg(long, default_value = "")]
        title: String,
        /// Initial content (`-` for stdin).
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Print a tile's content
    Show { id: String },
    /// Replace a tile's content
    Save {
        id: String,
        /// New content (`-` for stdin).
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    /// Store a new order listing every tile exactly once
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Move one tile next to another
    Move {
        dragged: String,
        target: String,
        /// Drop after the target instead of before it.
        #[arg(long)]
        after: bool,
    },
    /// Retitle a tile
    Rename { id: String, title: String },
    /// Delete a tile
    Rm { id: String },
    /// Stream stdin into a tile, saving after each pause in input
    Pipe { id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TilesResult {
    Listed { tiles: Vec<TileEntry> },
    Created { tile: TileEntry },
    Shown { tile: Tile },
    Saved { id: String, changed: bool },
    Ordered { tiles: Vec<TileEntry> },
    Moved { moved: bool, tiles: Vec<TileEntry> },
    Renamed { id: String, found: bool },
    Deleted { id: String },
    Piped { id: String, bytes: usize },
}

pub fn run(args: TilesArgs, ctx: &Context) -> anyhow::Result<()> {
    let studio = ctx.studio()?;
    let result = execute(&args.story, args.action, &studio)?;
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(story: &str, action: TilesAction, studio: &Studio) -> anyhow::Result<TilesResult> {
    let store = studio.stories().tiles(story)?;
    Ok(match action {
        TilesAction::Ls => TilesResult::Listed { tiles: store.list()? },
        TilesAction::New { title, file } => {
            let content = file.as_deref().map(read_content).transpose()?.unwrap_or_default();
            TilesResult::Created { tile: store.create(&title, &content)? }
        }
        TilesAction::Show { id } => TilesResult::Shown { tile: store.get(&id)? },
        TilesAction::Save { id, file } => {
            let content = read_content(&file)?;
            let mut session = studio.open_story(story)?;
            studio.open_tile(&mut session, &id)?;
            let outcome = studio.save_editor(&mut session, &content)?;
            TilesResult::Saved { id, changed: outcome == SaveOutcome::Saved }
        }
        TilesAction::Reorder { ids } => {
            let order = permuted_order(&store.list()?, ids)?;
            TilesResult::Ordered { tiles: store.reorder(order)? }
        }
        TilesAction::Move { dragged, target, after } => {
            let placement = if after { DropPlacement::After } else { DropPlacement::Before };
            let mut session = studio.open_story(story)?;
            let moved = studio.move_tile(&mut session, &dragged, &target, placement)?;
            TilesResult::Moved { moved, tiles: session.tiles().entries().to_vec() }
        }
        TilesAction::Rename { id, title } => {
            let found = store.rename(&id, &title)?;
            TilesResult::Renamed { id, found }
        }
        TilesAction::Rm { id } => {
            store.delete(&id)?;
            TilesResult::Deleted { id }
        }
        TilesAction::Pipe { id } => return pipe(studio, story, id),
    })
}

/// Rearrange `current` into the order of `ids`. Dropping an id would leave
/// its content orphaned, so `ids` must name every tile exactly once.
fn permuted_order(current: &[TileEntry], ids: Vec<String>) -> anyhow::Result<Vec<TileEntry>> {
    let mut remaining = current.to_vec();
    let mut order = Vec::with_capacity(ids.len());
    for id in ids {
        match remaining.iter().position(|entry| entry.id == id) {
            Some(at) => order.push(remaining.remove(at)),
            None if current.iter().any(|entry| entry.id == id) => bail!("tile `{id}` is listed twice"),
            None => bail!("unknown tile `{id}`"),
        }
    }
    if !remaining.is_empty() {
        let missing: Vec<&str> = remaining.iter().map(|entry| entry.id.as_str()).collect();
        bail!("order must list every tile; missing {} (use `tiles rm` to delete)", missing.join(", "));
    }
    Ok(order)
}

/// Append stdin to the tile line by line through the debounced autosave.
fn pipe(studio: &Studio, story: &str, id: String) -> anyhow::Result<TilesResult> {
    let mut session = studio.open_story(story)?;
    let mut content = studio.open_tile(&mut session, &id)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start autosave runtime")?;

    runtime.block_on(async {
        let handle = studio.autosave(&session)?;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        let reader = tokio::task::spawn_blocking(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        while let Some(line) = rx.recv().await {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(&line);
            handle.edit(content.clone());
        }
        let _ = reader.await;
        handle.shutdown().await;
        debug!(story, tile_id = %id, bytes = content.len(), "pipe finished");
        Ok::<_, anyhow::Error>(TilesResult::Piped { id, bytes: content.len() })
    })
}

fn format_human(result: &TilesResult) -> String {
    match result {
        TilesResult::Listed { tiles } | TilesResult::Ordered { tiles } => list_human(tiles),
        TilesResult::Moved { moved: false, .. } => "Nothing moved: unknown tile id.".into(),
        TilesResult::Moved { tiles, .. } => list_human(tiles),
        TilesResult::Created { tile } => format!("Created {}", tile.id),
        TilesResult::Shown { tile } => tile.content.clone(),
        TilesResult::Saved { id, changed: true } => format!("Saved {id}"),
        TilesResult::Saved { id, changed: false } => format!("{id} unchanged"),
        TilesResult::Renamed { id, found: true } => format!("Renamed {id}"),
        TilesResult::Renamed { id, found: false } => format!("No tile {id} in the order"),
        TilesResult::Deleted { id } => format!("Deleted {id}"),
        TilesResult::Piped { id, bytes } => format!("Wrote {bytes} byte(s) to {id}"),
    }
}

fn list_human(tiles: &[TileEntry]) -> String {
    if tiles.is_empty() {
        return "No tiles.".into();
    }
    let mut lines = vec![format!("{} tile(s)", tiles.len())];
    for (index, tile) in tiles.iter().enumerate() {
        let title = if tile.title.is_empty() { "(untitled)" } else { tile.title.as_str() };
        lines.push(format!("  {:>3}. {}  {}", index + 1, tile.id, title));
    }
    lines.join("\n")
}
