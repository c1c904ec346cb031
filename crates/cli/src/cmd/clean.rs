//! Implementation of the `partplan clean` command.

use anyhow::Result;

use super::{Context, part_names};
use crate::output::{print_info, print_success};

/// Forget recorded state of the given parts, or of all parts.
pub fn cmd_clean(ctx: &Context, parts: &[String]) -> Result<()> {
  let mut lifecycle = ctx.lifecycle()?;
  let cleaned = lifecycle.clean(&part_names(parts))?;

  if cleaned.is_empty() {
    print_info("Nothing to clean");
  } else {
    print_success(&format!("Cleaned state of {} part(s): {}", cleaned.len(), cleaned.join(", ")));
  }
  Ok(())
}
