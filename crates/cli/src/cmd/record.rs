//! Implementation of the `partplan record` command.
//!
//! Records the planned steps as completed. An external executor calls this
//! after it has actually run them, so the next plan skips them.

use anyhow::{Context as _, Result};
use tracing::info;

use partplan_lib::step::Step;

use super::{Context, part_names};
use crate::output::{print_info, print_success};

pub fn cmd_record(ctx: &Context, step: Step, parts: &[String]) -> Result<()> {
  let mut lifecycle = ctx.lifecycle()?;
  let actions = lifecycle.plan(step, &part_names(parts))?;

  if actions.is_empty() {
    print_info("Nothing to record");
    return Ok(());
  }

  for action in &actions {
    lifecycle
      .record(action)
      .with_context(|| format!("Failed to record {}:{}", action.part, action.step))?;
    info!(part = %action.part, step = %action.step, "recorded");
  }

  print_success(&format!("Recorded {} step(s)", actions.len()));
  Ok(())
}
