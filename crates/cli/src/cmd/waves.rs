//! Implementation of the `partplan waves` command.
//!
//! Groups the plan into waves whose steps may run concurrently, split into
//! batches of at most `--jobs` steps.

use anyhow::Result;

use partplan_lib::step::Step;

use super::{Context, part_names};
use crate::output::{print_info, print_json, print_success};

pub fn cmd_waves(ctx: &Context, step: Step, parts: &[String], json: bool) -> Result<()> {
  let lifecycle = ctx.lifecycle()?;
  let waves = lifecycle.waves(step, &part_names(parts))?;

  if json {
    return print_json(&waves);
  }

  if waves.is_empty() {
    print_success(&format!("Nothing to do: everything is up to date for '{}'", step));
    return Ok(());
  }

  for (i, wave) in waves.waves().iter().enumerate() {
    println!("Wave {} ({} step(s)):", i + 1, wave.len());
    for batch in waves.batches(i) {
      let labels: Vec<String> = batch.iter().map(|a| format!("{}:{}", a.part, a.step)).collect();
      println!("  [{}]", labels.join(", "));
    }
  }

  println!();
  print_info(&format!(
    "{} wave(s), at most {} step(s) at a time",
    waves.len(),
    waves.parallel()
  ));
  Ok(())
}
