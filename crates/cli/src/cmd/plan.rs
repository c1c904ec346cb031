//! Implementation of the `partplan plan` command.
//!
//! Prints the actions needed to bring the selected parts to a target step,
//! without running or recording anything.

use anyhow::Result;

use partplan_lib::sequencer::ActionKind;
use partplan_lib::step::Step;

use super::{Context, part_names};
use crate::output::{print_action, print_info, print_json, print_success};

pub fn cmd_plan(ctx: &Context, step: Step, parts: &[String], trace: bool, json: bool) -> Result<()> {
  let lifecycle = ctx.lifecycle()?;
  let names = part_names(parts);

  let actions = if trace {
    lifecycle.trace(step, &names)?
  } else {
    lifecycle.plan(step, &names)?
  };

  if json {
    return print_json(&actions);
  }

  let pending = actions.iter().filter(|a| !a.is_skip()).count();
  if pending == 0 && !trace {
    print_success(&format!("Nothing to do: everything is up to date for '{}'", step));
    return Ok(());
  }

  for action in &actions {
    print_action(action);
  }

  println!();
  let runs = actions.iter().filter(|a| a.kind == ActionKind::Run).count();
  let reruns = actions.iter().filter(|a| a.kind == ActionKind::Rerun).count();
  print_info(&format!(
    "{} step(s) to reach '{}': {} to run, {} to rerun",
    pending, step, runs, reruns
  ));

  Ok(())
}
