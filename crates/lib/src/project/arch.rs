use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target architectures, named the way Debian names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  Amd64,
  Arm64,
  Armhf,
  I386,
  Ppc64el,
  Riscv64,
  S390x,
}

impl Arch {
  /// Detect the host CPU architecture at runtime
  pub fn host() -> Option<Self> {
    Self::from_rust_name(std::env::consts::ARCH)
  }

  fn from_rust_name(name: &str) -> Option<Self> {
    match name {
      "x86_64" => Some(Self::Amd64),
      "aarch64" => Some(Self::Arm64),
      "arm" => Some(Self::Armhf),
      "x86" => Some(Self::I386),
      "powerpc64" => Some(Self::Ppc64el),
      "riscv64" => Some(Self::Riscv64),
      "s390x" => Some(Self::S390x),
      _ => None,
    }
  }

  /// Returns the Debian identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Amd64 => "amd64",
      Self::Arm64 => "arm64",
      Self::Armhf => "armhf",
      Self::I386 => "i386",
      Self::Ppc64el => "ppc64el",
      Self::Riscv64 => "riscv64",
      Self::S390x => "s390x",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = String;

  /// Accepts Debian names (`amd64`) as well as Rust names (`x86_64`).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_ascii_lowercase();
    let debian = match name.as_str() {
      "amd64" => Some(Self::Amd64),
      "arm64" => Some(Self::Arm64),
      "armhf" => Some(Self::Armhf),
      "i386" => Some(Self::I386),
      "ppc64el" => Some(Self::Ppc64el),
      "riscv64" => Some(Self::Riscv64),
      "s390x" => Some(Self::S390x),
      _ => None,
    };
    debian
      .or_else(|| Self::from_rust_name(&name))
      .ok_or_else(|| s.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_debian_and_rust_names() {
    assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::Amd64);
    assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::Amd64);
    assert_eq!("AArch64".parse::<Arch>().unwrap(), Arch::Arm64);
    assert_eq!("sparc".parse::<Arch>(), Err("sparc".to_string()));
  }

  #[test]
  fn display_uses_debian_names() {
    assert_eq!(Arch::Ppc64el.to_string(), "ppc64el");
    assert_eq!(serde_json::to_string(&Arch::Riscv64).unwrap(), "\"riscv64\"");
  }
}
