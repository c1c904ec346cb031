//! The step lattice.
//!
//! Every part moves through the same five lifecycle steps, in this order:
//!
//! ```text
//! pull -> overlay -> build -> stage -> prime
//! ```
//!
//! Steps are totally ordered by their ordinal. A later step of a part is only
//! valid if every earlier step of the same part has completed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
  Pull,
  Overlay,
  Build,
  Stage,
  Prime,
}

/// Errors produced when turning user input into a [`Step`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
  /// The name or ordinal does not belong to the lattice.
  #[error("invalid step '{0}': expected one of pull, overlay, build, stage, prime")]
  InvalidStep(String),
}

impl Step {
  /// All steps in lattice order.
  pub const ALL: [Step; 5] = [Step::Pull, Step::Overlay, Step::Build, Step::Stage, Step::Prime];

  /// Position of this step in the lattice, starting at zero.
  pub fn ordinal(self) -> u8 {
    match self {
      Step::Pull => 0,
      Step::Overlay => 1,
      Step::Build => 2,
      Step::Stage => 3,
      Step::Prime => 4,
    }
  }

  /// Look up a step by ordinal.
  pub fn from_ordinal(ordinal: u8) -> Result<Self, StepError> {
    Self::ALL
      .get(ordinal as usize)
      .copied()
      .ok_or_else(|| StepError::InvalidStep(ordinal.to_string()))
  }

  /// Lowercase name of the step.
  pub fn as_str(self) -> &'static str {
    match self {
      Step::Pull => "pull",
      Step::Overlay => "overlay",
      Step::Build => "build",
      Step::Stage => "stage",
      Step::Prime => "prime",
    }
  }

  /// The step immediately before this one, if any.
  pub fn previous(self) -> Option<Step> {
    self.ordinal().checked_sub(1).and_then(|o| Step::from_ordinal(o).ok())
  }

  /// The step immediately after this one, if any.
  pub fn next(self) -> Option<Step> {
    Step::from_ordinal(self.ordinal() + 1).ok()
  }

  /// True if this step is `other` or comes before it.
  pub fn is_at_or_before(self, other: Step) -> bool {
    self <= other
  }

  /// Steps from `pull` up to and including `self`.
  pub fn up_to(self) -> impl Iterator<Item = Step> {
    std::iter::successors(Some(Step::Pull), |s| s.next()).take_while(move |s| *s <= self)
  }

  /// The step every dependency must have reached before a dependent can run
  /// `self`.
  ///
  /// Building and staging consume the staged output of dependencies. Pulling
  /// and overlaying are independent of dependencies, and priming is a per-part
  /// concern.
  pub fn dependency_prerequisite(self) -> Option<Step> {
    match self {
      Step::Pull | Step::Overlay | Step::Prime => None,
      Step::Build | Step::Stage => Some(Step::Stage),
    }
  }

  /// Part property keys whose values determine this step's outcome.
  pub fn property_keys(self) -> &'static [&'static str] {
    match self {
      Step::Pull => &[
        "plugin",
        "source",
        "source-type",
        "source-tag",
        "source-commit",
        "source-branch",
        "source-depth",
        "source-checksum",
        "source-subdir",
        "override-pull",
        "stage-packages",
      ],
      Step::Overlay => &["overlay", "overlay-packages", "overlay-script"],
      Step::Build => &[
        "after",
        "build-attributes",
        "build-environment",
        "build-packages",
        "organize",
        "override-build",
      ],
      Step::Stage => &["stage", "override-stage"],
      Step::Prime => &["prime", "override-prime"],
    }
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Step {
  type Err = StepError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase();
    Self::ALL
      .into_iter()
      .find(|step| step.as_str() == normalized)
      .ok_or_else(|| StepError::InvalidStep(s.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ordinals_follow_lattice_order() {
    let ordinals: Vec<u8> = Step::ALL.iter().map(|s| s.ordinal()).collect();
    assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
    assert!(Step::Pull < Step::Overlay);
    assert!(Step::Stage < Step::Prime);
  }

  #[test]
  fn from_ordinal_rejects_out_of_range() {
    assert_eq!(Step::from_ordinal(2).unwrap(), Step::Build);
    assert_eq!(Step::from_ordinal(5), Err(StepError::InvalidStep("5".to_string())));
  }

  #[test]
  fn parse_is_case_insensitive() {
    assert_eq!("PRIME".parse::<Step>().unwrap(), Step::Prime);
    assert_eq!(" stage ".parse::<Step>().unwrap(), Step::Stage);
    assert!(matches!("deploy".parse::<Step>(), Err(StepError::InvalidStep(_))));
  }

  #[test]
  fn previous_and_next() {
    assert_eq!(Step::Pull.previous(), None);
    assert_eq!(Step::Build.previous(), Some(Step::Overlay));
    assert_eq!(Step::Stage.next(), Some(Step::Prime));
    assert_eq!(Step::Prime.next(), None);
  }

  #[test]
  fn up_to_is_inclusive() {
    let steps: Vec<Step> = Step::Build.up_to().collect();
    assert_eq!(steps, vec![Step::Pull, Step::Overlay, Step::Build]);
    assert_eq!(Step::Pull.up_to().count(), 1);
  }

  #[test]
  fn at_or_before() {
    assert!(Step::Build.is_at_or_before(Step::Build));
    assert!(Step::Pull.is_at_or_before(Step::Prime));
    assert!(!Step::Prime.is_at_or_before(Step::Stage));
  }

  #[test]
  fn dependency_prerequisites() {
    assert_eq!(Step::Pull.dependency_prerequisite(), None);
    assert_eq!(Step::Overlay.dependency_prerequisite(), None);
    assert_eq!(Step::Build.dependency_prerequisite(), Some(Step::Stage));
    assert_eq!(Step::Stage.dependency_prerequisite(), Some(Step::Stage));
    assert_eq!(Step::Prime.dependency_prerequisite(), None);
  }

  #[test]
  fn serde_uses_lowercase_names() {
    assert_eq!(serde_json::to_string(&Step::Overlay).unwrap(), "\"overlay\"");
    let step: Step = serde_json::from_str("\"build\"").unwrap();
    assert_eq!(step, Step::Build);
  }
}
