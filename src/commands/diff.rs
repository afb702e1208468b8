use anyhow::{Context as _, Result};
use declarative::{
    DiffSummary, GraphPair, ResourceDiffMetadata, ResourceGraph, assign_apply_order,
    diff_resources, group_by_level,
};
use infragraph::StateSnapshot;
use infragraph::report;

use crate::Context;
use crate::cli::DiffArgs;

pub fn run(ctx: &Context, args: &DiffArgs) -> Result<()> {
    let old = StateSnapshot::read(&args.old)?;
    let new = StateSnapshot::read(&args.new)?;
    let levels = plan(&new.resources.old, &old.resources.old)?;

    if args.json {
        let diffs: Vec<Vec<_>> = levels
            .iter()
            .map(|level| level.iter().map(|m| &m.diff).collect())
            .collect();
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }

    let diffs: Vec<_> = levels.iter().flatten().map(|m| m.diff.clone()).collect();
    if !ctx.quiet {
        report::header("Resource Diff");
        report::kv("Old", &format!("{} ({})", args.old.display(), old.saved_at));
        report::kv("New", &format!("{} ({})", args.new.display(), new.saved_at));
        println!();
    }
    print!("{}", report::render_levels(&levels));
    println!("{}", report::render_diff_summary(&DiffSummary::from_diffs(&diffs)));
    Ok(())
}

/// Resource diffs from `old` to `new`, grouped by apply level
pub fn plan(new: &ResourceGraph, old: &ResourceGraph) -> Result<Vec<Vec<ResourceDiffMetadata>>> {
    let mut diffs: Vec<ResourceDiffMetadata> = diff_resources(new, old)
        .into_iter()
        .map(|d| ResourceDiffMetadata::new(d, Vec::new()))
        .collect();
    assign_apply_order(&mut diffs, &GraphPair::new(new, old))
        .context("Could not order resource diffs")?;
    log::info!("{} resource diffs", diffs.len());
    Ok(group_by_level(diffs))
}
