//! Terminal rendering of diffs and transactions

use colored::{ColoredString, Colorize};
use declarative::{Action, Diff, DiffAction, DiffMetadata, DiffSummary, TransactionSummary};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

fn symbol(action: DiffAction) -> ColoredString {
    match action {
        DiffAction::Add => "+".green(),
        DiffAction::Delete => "-".red(),
        DiffAction::Update => "~".yellow(),
        DiffAction::Validate | DiffAction::Replace => "?".blue(),
    }
}

/// One diff as `+ node field = value`
pub fn render_diff(diff: &Diff) -> String {
    let value = match &diff.value {
        serde_json::Value::Null => String::new(),
        v => format!(" = {v}"),
    };
    format!(
        "{} {} {}{}",
        symbol(diff.action),
        diff.node.to_string().bold(),
        diff.field,
        value.dimmed()
    )
}

/// Planned or applied diffs, one block per level
pub fn render_levels<A: ?Sized + Action>(levels: &[Vec<DiffMetadata<A>>]) -> String {
    let mut out = String::new();
    for (index, level) in levels.iter().enumerate() {
        out.push_str(&format!("{}\n", format!("Level {index}").cyan().bold()));
        for metadata in level {
            out.push_str(&format!("  {}", render_diff(&metadata.diff)));
            let actions = metadata.action_names();
            if !actions.is_empty() {
                out.push_str(&format!(" {}", format!("[{}]", actions.join(", ")).dimmed()));
            }
            out.push('\n');
        }
    }
    out
}

pub fn render_diff_summary(summary: &DiffSummary) -> String {
    if !summary.has_changes() {
        return "No changes".to_string();
    }
    format!(
        "{} to add, {} to change, {} to remove",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    )
}

pub fn render_transaction_summary(summary: &TransactionSummary) -> String {
    format!(
        "{} added, {} updated, {} deleted in {} levels",
        summary.added, summary.updated, summary.deleted, summary.levels
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{NodeContext, ResourceDiffMetadata, assign_apply_order, group_by_level};
    use serde_json::json;

    #[test]
    fn test_render_levels_plain() {
        colored::control::set_override(false);

        let vpc = NodeContext::new("vpc", "vpc-1");
        let mut diffs = vec![
            ResourceDiffMetadata::new(
                Diff::lifecycle(vpc.clone(), DiffAction::Add, "resourceId", json!("vpc-1")),
                Vec::new(),
            ),
            ResourceDiffMetadata::new(
                Diff::new(
                    NodeContext::new("s3", "logs"),
                    DiffAction::Delete,
                    "versioning",
                    serde_json::Value::Null,
                ),
                Vec::new(),
            ),
        ];
        assign_apply_order(&mut diffs, &declarative::ResourceGraph::new()).unwrap();
        let rendered = render_levels(&group_by_level(diffs));

        assert_eq!(
            rendered,
            "Level 0\n  + vpc=vpc-1 resourceId = \"vpc-1\"\n  - s3=logs versioning\n"
        );
    }

    #[test]
    fn test_summaries() {
        colored::control::set_override(false);

        assert_eq!(render_diff_summary(&DiffSummary::default()), "No changes");
        let diffs = [Diff::new(
            NodeContext::new("vpc", "vpc-1"),
            DiffAction::Update,
            "CidrBlock",
            json!("10.1.0.0/16"),
        )];
        assert_eq!(
            render_diff_summary(&DiffSummary::from_diffs(&diffs)),
            "0 to add, 1 to change, 0 to remove"
        );

        let mut applied = TransactionSummary::default();
        applied.add_action(DiffAction::Add);
        applied.levels = 1;
        assert_eq!(
            render_transaction_summary(&applied),
            "1 added, 0 updated, 0 deleted in 1 levels"
        );
    }
}
