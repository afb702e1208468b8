use anyhow::{Context as _, Result};
use declarative::{GraphPair, Node, TransactionService, diff_models};
use infragraph::desired::{DesiredResourcesAction, DesiredState, StateOnlyResourceAction};
use infragraph::{InputService, ProgressBarCallback, StateStore, report};

use crate::Context;
use crate::cli::ApplyArgs;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let dir = match &args.state_dir {
        Some(dir) => dir.clone(),
        None => ctx.config.state_dir()?,
    };
    let store = StateStore::new(&dir);
    let mut state = store.load()?;
    let desired = DesiredState::read(&args.desired)?;

    let mut inputs = InputService::new();
    for assignment in &args.inputs {
        inputs.register_assignment(assignment)?;
    }
    for (_, model) in desired.models.nodes() {
        inputs.register_model(&args.module, model.node_name(), model.properties());
    }

    let service = TransactionService::new()
        .with_model_action(DesiredResourcesAction::new(
            desired.resources.clone(),
            state.resources.old.clone(),
        ))
        .with_resource_action(StateOnlyResourceAction)
        .with_inputs(inputs.resolved_inputs());

    let diffs = diff_models(&desired.models, &state.models);
    log::info!("{} model diffs", diffs.len());

    let mut progress = ProgressBarCallback::new();
    let mut transaction = service.begin_transaction(
        diffs,
        GraphPair::new(&desired.models, &state.models),
        &mut state.resources,
        ctx.config.transaction.clone(),
    );
    if !ctx.quiet {
        transaction = transaction.with_progress(&mut progress);
    }
    let result = transaction.finish();

    match result {
        Ok(outcome) => {
            state.resources.commit()?;
            state.models = desired.models;
            store.save(&mut state)?;

            if ctx.verbose > 0 {
                print!("{}", report::render_levels(&outcome.resource_transaction));
            }
            println!("{}", report::render_transaction_summary(&outcome.summary));
            report::success(&format!("Saved {}", store.state_file().display()));
            Ok(())
        }
        Err(e) if e.is_planning_error() => {
            Err(e).context("Transaction rejected, state left unchanged")
        }
        Err(e) => {
            // Confirmed work is kept; the rest stays dirty
            state.resources.commit()?;
            store.save(&mut state)?;
            if progress.failed() > 0 {
                report::warn(&format!("{} diffs failed", progress.failed()));
            }
            report::warn("Run `infragraph status` to see unconfirmed resources");
            Err(e).context("Transaction failed")
        }
    }
}
