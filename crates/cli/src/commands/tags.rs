// `storyloom tags`: every tag in a story with its display colors.

use clap::Args;
use serde::{Deserialize, Serialize};
use storyloom_common::tag::color_of;
use storyloom_common::types::TagColor;
use storyloom_studio::session::Studio;

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct TagsArgs {
    /// Story name.
    story: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagEntry {
    pub tag: String,
    pub color: TagColor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagsResult {
    pub story: String,
    pub tags: Vec<TagEntry>,
}

pub fn run(args: TagsArgs, ctx: &Context) -> anyhow::Result<()> {
    let studio = ctx.studio()?;
    let result = execute(&args.story, &studio)?;
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(story: &str, studio: &Studio) -> anyhow::Result<TagsResult> {
    let session = studio.open_story(story)?;
    let tags = studio
        .story_tags(&session)?
        .into_iter()
        .map(|tag| TagEntry { color: color_of(&tag), tag })
        .collect();
    Ok(TagsResult { story: session.story().to_string(), tags })
}

fn format_human(result: &TagsResult) -> String {
    if result.tags.is_empty() {
        return format!("No tags in {}.", result.story);
    }
    let tags: Vec<String> = result.tags.iter().map(|entry| format!("#{}", entry.tag)).collect();
    tags.join(" ")
}
