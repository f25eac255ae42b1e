// `storyloom stories`: create, rename, delete and list stories.

use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use storyloom_studio::session::Studio;

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct StoriesArgs {
    #[command(subcommand)]
    action: StoriesAction,
}

#[derive(Debug, Subcommand)]
enum StoriesAction {
    /// List stories
    Ls,
    /// Create a story
    New { name: String },
    /// Rename a story
    Rename { old: String, new: String },
    /// Delete a story and everything in it
    Rm { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StoriesResult {
    Listed { stories: Vec<String> },
    Created { story: String },
    Renamed { from: String, to: String },
    Deleted { story: String },
}

pub fn run(args: StoriesArgs, ctx: &Context) -> anyhow::Result<()> {
    let studio = ctx.studio()?;
    let result = execute(args.action, &studio)?;
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(action: StoriesAction, studio: &Studio) -> anyhow::Result<StoriesResult> {
    let stories = studio.stories();
    Ok(match action {
        StoriesAction::Ls => StoriesResult::Listed { stories: stories.list()? },
        StoriesAction::New { name } => StoriesResult::Created { story: stories.create(&name)? },
        StoriesAction::Rename { old, new } => {
            let to = stories.rename(&old, &new)?;
            StoriesResult::Renamed { from: old, to }
        }
        StoriesAction::Rm { name } => {
            stories.delete(&name)?;
            StoriesResult::Deleted { story: name }
        }
    })
}

fn format_human(result: &StoriesResult) -> String {
    match result {
        StoriesResult::Listed { stories } if stories.is_empty() => "No stories.".into(),
        StoriesResult::Listed { stories } => {
            let mut lines = vec![format!("{} story(ies)", stories.len())];
            lines.extend(stories.iter().map(|story| format!("  {story}")));
            lines.join("\n")
        }
        StoriesResult::Created { story } => format!("Created {story}"),
        StoriesResult::Renamed { from, to } => format!("Renamed {from} to {to}"),
        StoriesResult::Deleted { story } => format!("Deleted {story}"),
    }
}
