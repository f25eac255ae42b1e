// `storyloom render`: annotated HTML preview.

use clap::Args;
use serde::{Deserialize, Serialize};
use storyloom_studio::session::Studio;

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Story name.
    story: String,

    /// Render one tile instead of the full document.
    #[arg(long, value_name = "ID", conflicts_with = "entity")]
    tile: Option<String>,

    /// Render one entity's section instead of the full document.
    #[arg(long, value_name = "NAME")]
    entity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderResult {
    pub story: String,
    /// `full_document`, `tile` or `entity`.
    pub view: String,
    pub html: String,
}

pub fn run(args: RenderArgs, ctx: &Context) -> anyhow::Result<()> {
    let studio = ctx.studio()?;
    let result = execute(args, &studio)?;
    output::print_output(ctx.format, &result, |result| result.html.clone())?;
    Ok(())
}

fn execute(args: RenderArgs, studio: &Studio) -> anyhow::Result<RenderResult> {
    let mut session = studio.open_story(&args.story)?;
    let (view, html) = match (args.tile, args.entity) {
        (Some(id), _) => {
            let content = studio.open_tile(&mut session, &id)?;
            ("tile", studio.render_editor_preview(&session, &content))
        }
        (None, Some(name)) => {
            let content = studio.open_entity(&mut session, &name)?;
            ("entity", studio.render_editor_preview(&session, &content))
        }
        (None, None) => ("full_document", studio.render_full_document(&session)?),
    };
    Ok(RenderResult { story: session.story().to_string(), view: view.to_string(), html })
}
