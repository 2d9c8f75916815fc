//! Operating modes for the history client.

use serde::{Deserialize, Serialize};

/// Which partition(s) the client writes to and reads from.
///
/// The set is closed: routing code matches exhaustively on this enum, so an
/// unhandled mode can never reach storage code. String surfaces (config files,
/// CLI flags) go through [`Mode::from_str`] and are rejected up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Single shared partition, visible to every machine and user.
    #[default]
    Global,
    /// Per-user partition; requires a resolved user.
    User,
    /// Per-machine partition.
    Machine,
    /// Fan-out writes to global + machine (+ user when resolved) and
    /// timestamp-merged reads across all three.
    Hybrid,
}

impl Mode {
    /// Stable lowercase name, matching the wire/config spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Global => "global",
            Mode::User => "user",
            Mode::Machine => "machine",
            Mode::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(Mode::Global),
            "user" => Ok(Mode::User),
            "machine" => Ok(Mode::Machine),
            "hybrid" => Ok(Mode::Hybrid),
            other => Err(format!(
                "invalid mode: '{}'. Use 'global', 'user', 'machine', or 'hybrid'.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for mode in [Mode::Global, Mode::User, Mode::Machine, Mode::Hybrid] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!("HYBRID".parse::<Mode>().unwrap(), Mode::Hybrid);
        assert_eq!("Global".parse::<Mode>().unwrap(), Mode::Global);
    }

    #[test]
    fn test_mode_rejects_unknown_values() {
        assert!("bogus".parse::<Mode>().is_err());
        assert!("".parse::<Mode>().is_err());
    }
}
