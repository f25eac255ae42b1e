// CLI subcommand dispatch.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Subcommand;
use storyloom_studio::config::StudioConfig;
use storyloom_studio::session::Studio;

use crate::output::OutputFormat;

pub mod entities;
pub mod render;
pub mod stories;
pub mod tags;
pub mod tiles;

#[derive(Subcommand)]
pub enum Command {
    /// Create, rename, delete and list stories
    Stories(stories::StoriesArgs),
    /// Manage a story's tiles
    Tiles(tiles::TilesArgs),
    /// List and edit a story's entities
    Entities(entities::EntitiesArgs),
    /// Render annotated HTML for a tile, an entity or the full document
    Render(render::RenderArgs),
    /// List tags used across a story
    Tags(tags::TagsArgs),
}

/// Options shared by every subcommand.
pub struct Context {
    pub root: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Context {
    pub fn studio(&self) -> anyhow::Result<Studio> {
        let config = StudioConfig::load();
        let studio = match &self.root {
            Some(root) => Studio::with_root(config, root),
            None => Studio::open(config),
        };
        studio.context("failed to open stories root")
    }
}

pub fn run(cmd: Command, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        Command::Stories(args) => stories::run(args, ctx),
        Command::Tiles(args) => tiles::run(args, ctx),
        Command::Entities(args) => entities::run(args, ctx),
        Command::Render(args) => render::run(args, ctx),
        Command::Tags(args) => tags::run(args, ctx),
    }
}

/// Read editor content from a file, or from stdin when the path is `-`.
pub(crate) fn read_content(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content).context("failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use storyloom_studio::config::StudioConfig;
    use storyloom_studio::session::Studio;
    use tempfile::TempDir;

    pub const CAST: &str = "## Anne\n\nThe lead. #hero\n\n## Villain\n\nCold. #foe";

    /// A studio over a temp root with one story, `Tale`, holding `CAST`.
    pub fn studio() -> (TempDir, Studio) {
        let dir = TempDir::new().unwrap();
        let studio = Studio::with_root(StudioConfig::default(), dir.path()).unwrap();
        studio.stories().create("Tale").unwrap();
        studio.stories().save_highlights("Tale", CAST).unwrap();
        (dir, studio)
    }
}
