//! The seven content stages the pipeline can produce.

use std::fmt;
use std::str::FromStr;

/// A named content category. The name doubles as the payload key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Overview,
    Technical,
    Market,
    Design,
    Diagrams,
    RawText,
    Prompts,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Overview,
        Stage::Technical,
        Stage::Market,
        Stage::Design,
        Stage::Diagrams,
        Stage::RawText,
        Stage::Prompts,
    ];

    /// Wire name, also the key holding the stage payload.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Overview => "overview",
            Stage::Technical => "technical",
            Stage::Market => "market",
            Stage::Design => "design",
            Stage::Diagrams => "diagrams",
            Stage::RawText => "rawText",
            Stage::Prompts => "prompts",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{}'", s))
    }
}
