//! Status command implementation.
//!
//! Lists the recorded state of every step, grouped by part.

use anyhow::Result;

use super::Context;
use crate::output::{format_timestamp, print_info, print_json, print_stat, print_success};

pub fn cmd_status(ctx: &Context, json: bool) -> Result<()> {
  let lifecycle = ctx.lifecycle()?;
  let states = lifecycle.status()?;

  if json {
    return print_json(&states);
  }

  if states.is_empty() {
    print_info("No step state recorded. Run 'partplan record' after executing a plan.");
    return Ok(());
  }

  let mut current: Option<&str> = None;
  for state in &states {
    if current != Some(state.part.as_str()) {
      if current.is_some() {
        println!();
      }
      print_success(&state.part);
      current = Some(state.part.as_str());
    }
    print_stat(
      state.step.as_str(),
      &format!("{} ({})", state.fingerprint.short(), format_timestamp(state.completed_at)),
    );
  }

  Ok(())
}
