// `storyloom entities`: list, add, show and edit a story's entities.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use storyloom_common::section::compose_section;
use storyloom_common::section::merge::SectionEdit;
use storyloom_common::section::summary::EntitySummary;
use storyloom_studio::session::{EntityListItem, EntitySort, SaveOutcome, Studio, View};

use super::{read_content, Context};
use crate::output;

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Story name.
    story: String,

    #[command(subcommand)]
    action: EntitiesAction,
}

#[derive(Debug, Subcommand)]
enum EntitiesAction {
    /// List entities with mention counts
    Ls {
        /// Only entities whose section mentions this tag.
        #[arg(long)]
        tag: Option<String>,
        /// `alpha` or `count` (default from config).
        #[arg(long)]
        sort: Option<String>,
    },
    /// Add an empty entity section unless it exists
    Add { name: String },
    /// Print an entity's editor content and summary
    Show { name: String },
    /// Save edited entity content
    Edit {
        name: String,
        /// Section content, with or without its heading (`-` for stdin).
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        /// Current title when the edit renames the entity to NAME.
        #[arg(long, value_name = "OLD")]
        rename_from: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EntitiesResult {
    Listed { tag: Option<String>, entities: Vec<EntityListItem> },
    Added { name: String, created: bool },
    Shown { name: String, content: String, summary: Option<EntitySummary> },
    Edited { name: String, changed: bool },
}

pub fn run(args: EntitiesArgs, ctx: &Context) -> anyhow::Result<()> {
    let studio = ctx.studio()?;
    let result = execute(&args.story, args.action, &studio)?;
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(story: &str, action: EntitiesAction, studio: &Studio) -> anyhow::Result<EntitiesResult> {
    let mut session = studio.open_story(story)?;
    Ok(match action {
        EntitiesAction::Ls { tag, sort } => {
            let sort = match sort.as_deref() {
                None => studio.config().entities.sort,
                Some(value) => match EntitySort::parse(value) {
                    Some(sort) => sort,
                    None => bail!("unknown sort `{value}` (expected alpha or count)"),
                },
            };
            if let Some(tag) = &tag {
                session.toggle_tag_filter(tag);
            }
            let entities = studio.entity_list_sorted(&session, sort)?;
            EntitiesResult::Listed { tag: session.active_tag().map(str::to_string), entities }
        }
        EntitiesAction::Add { name } => {
            let created = studio.make_highlight(&mut session, &name)?;
            EntitiesResult::Added { name: name.trim().to_string(), created }
        }
        EntitiesAction::Show { name } => {
            let content = studio.open_entity(&mut session, &name)?;
            let summary = studio.entity_summary(&session, &name);
            EntitiesResult::Shown { name: name.trim().to_string(), content, summary }
        }
        EntitiesAction::Edit { name, file, rename_from } => {
            // Headingless content belongs to NAME, which may rename the entity.
            let edit = SectionEdit::from_editor(&read_content(&file)?, Some(name.as_str()))?;
            let content = compose_section(&edit.title, &edit.body);
            studio.open_entity(&mut session, rename_from.as_deref().unwrap_or(&name))?;
            let outcome = studio.save_editor(&mut session, &content)?;
            let name = match session.view() {
                Some(View::Entity { name }) => name.clone(),
                _ => name,
            };
            EntitiesResult::Edited { name, changed: outcome == SaveOutcome::Saved }
        }
    })
}

fn format_human(result: &EntitiesResult) -> String {
    match result {
        EntitiesResult::Listed { tag, entities } => {
            let scope = tag.as_deref().map(|tag| format!(" tagged #{tag}")).unwrap_or_default();
            if entities.is_empty() {
                return format!("No entities{scope}.");
            }
            let mut lines = vec![format!("{} entity(ies){scope}", entities.len())];
            for item in entities {
                let tags = if item.tags.is_empty() {
                    String::new()
                } else {
                    let tags: Vec<String> = item.tags.iter().map(|tag| format!("#{tag}")).collect();
                    format!("  {}", tags.join(" "))
                };
                lines.push(format!("  {} ({}){tags}", item.name, item.mentions));
            }
            lines.join("\n")
        }
        EntitiesResult::Added { name, created: true } => format!("Added {name}"),
        EntitiesResult::Added { name, created: false } => format!("{name} already exists"),
        EntitiesResult::Shown { content, .. } => content.clone(),
        EntitiesResult::Edited { name, changed: true } => format!("Saved {name}"),
        EntitiesResult::Edited { name, changed: false } => format!("{name} unchanged"),
    }
}
