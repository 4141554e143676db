//! Poster tone definitions.
//!
//! The tone picks the credits pool used for the billing block.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::policy::PolicyParseError;

/// Creative tone of a generated poster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Tone {
    /// Satirical, absurd parody. Also the fallback for unknown tones.
    #[default]
    Funny,
    /// High-octane blockbuster.
    Action,
    /// Ominous thriller or slasher.
    Horror,
    /// Melodramatic romance.
    Romance,
}

impl Tone {
    /// All known tones.
    pub const ALL: &'static [Tone] = &[Tone::Funny, Tone::Action, Tone::Horror, Tone::Romance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Funny => "Funny",
            Tone::Action => "Action",
            Tone::Horror => "Horror",
            Tone::Romance => "Romance",
        }
    }

    /// Parse a tone, falling back to the default tone for unknown input.
    pub fn parse_lenient(s: &str) -> Tone {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tone {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "funny" => Ok(Tone::Funny),
            "action" => Ok(Tone::Action),
            "horror" => Ok(Tone::Horror),
            "romance" => Ok(Tone::Romance),
            _ => Err(PolicyParseError::new("tone", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_parse() {
        assert_eq!("Horror".parse::<Tone>().unwrap(), Tone::Horror);
        assert_eq!("romance".parse::<Tone>().unwrap(), Tone::Romance);
        assert_eq!(" ACTION ".parse::<Tone>().unwrap(), Tone::Action);
        assert!("Western".parse::<Tone>().is_err());
    }

    #[test]
    fn test_lenient_parse_falls_back_to_default() {
        assert_eq!(Tone::parse_lenient("Western"), Tone::Funny);
        assert_eq!(Tone::parse_lenient(""), Tone::Funny);
        assert_eq!(Tone::parse_lenient("Horror"), Tone::Horror);
    }

    #[test]
    fn test_tone_serde_uses_display_names() {
        assert_eq!(serde_json::to_string(&Tone::Romance).unwrap(), "\"Romance\"");
        assert_eq!(Tone::Action.to_string(), "Action");
    }
}
