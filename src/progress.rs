//! Progress bars for transaction levels

use declarative::{Diff, NodeKind, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} {prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// One bar per level, cleared when the level completes
#[derive(Default)]
pub struct ProgressBarCallback {
    bar: Option<ProgressBar>,
    failed: usize,
}

impl ProgressBarCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs that failed so far
    pub fn failed(&self) -> usize {
        self.failed
    }
}

impl ProgressCallback for ProgressBarCallback {
    fn on_level_start(&mut self, kind: NodeKind, level: usize, count: usize) {
        let bar = ProgressBar::new(count as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_prefix(format!("{kind} level {level}"));
        self.bar = Some(bar);
    }

    fn on_diff_start(&mut self, diff: &Diff) {
        if let Some(bar) = &self.bar {
            bar.set_message(diff.to_string());
        }
    }

    fn on_diff_complete(&mut self, diff: &Diff, success: bool) {
        if !success {
            self.failed += 1;
            log::warn!("{diff} failed");
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_level_complete(&mut self, _kind: NodeKind, _level: usize) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{DiffAction, NodeContext};
    use serde_json::json;

    #[test]
    fn test_counts_failures_across_levels() {
        let mut progress = ProgressBarCallback::new();
        let diff = Diff::new(
            NodeContext::new("vpc", "vpc-1"),
            DiffAction::Update,
            "CidrBlock",
            json!("10.0.0.0/16"),
        );

        progress.on_level_start(NodeKind::Resource, 0, 2);
        progress.on_diff_start(&diff);
        progress.on_diff_complete(&diff, true);
        progress.on_diff_complete(&diff, false);
        assert_eq!(progress.bar.as_ref().map(ProgressBar::position), Some(2));
        progress.on_level_complete(NodeKind::Resource, 0);
        assert!(progress.bar.is_none());

        progress.on_level_start(NodeKind::Resource, 1, 1);
        progress.on_diff_complete(&diff, false);
        assert_eq!(progress.failed(), 2);
    }
}
