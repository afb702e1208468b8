use anyhow::Result;
use colored::Colorize;
use declarative::group_by_node;
use infragraph::{StateStore, report};

use crate::Context;
use crate::cli::StatusArgs;

pub fn run(ctx: &Context, args: &StatusArgs) -> Result<()> {
    let dir = match &args.state_dir {
        Some(dir) => dir.clone(),
        None => ctx.config.state_dir()?,
    };
    let store = StateStore::new(&dir);
    let state = store.load()?;

    report::header("State Status");
    report::kv("State", &store.state_file().display().to_string());
    report::kv("Saved", &state.saved_at.to_rfc3339());
    report::kv(
        "Resources",
        &format!(
            "{} desired, {} confirmed",
            state.resources.old.len().to_string().bold(),
            state.resources.actual.len().to_string().bold()
        ),
    );
    if ctx.verbose > 0 {
        report::kv("Models", &state.models.len().to_string());
    }
    println!();

    let dirty = state.resources.dirty_diffs();
    if dirty.is_empty() {
        report::success("No dirty resources");
        return Ok(());
    }

    let by_node = group_by_node(&dirty);
    report::warn(&format!(
        "{} resources have unconfirmed changes",
        by_node.len()
    ));
    for (node, diffs) in by_node {
        println!("  {}", node.to_string().yellow());
        for diff in diffs {
            println!("    {}", report::render_diff(diff));
        }
    }
    Ok(())
}
