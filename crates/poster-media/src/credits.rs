//! Joke credits for the poster billing block.

use poster_models::Tone;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FUNNY: &[&str] = &[
    "Al Dente",
    "Terry Cloth",
    "Barb Dwyer",
    "Justin Case",
    "Paige Turner",
    "Rick O'Shea",
    "Hazel Nutt",
];

const ACTION: &[&str] = &[
    "Max Power",
    "Rip Steel",
    "Jack Danger",
    "Rock Stone",
    "Blaze Storm",
    "Cliff Hanger",
];

const HORROR: &[&str] = &[
    "Gore Verbinski",
    "D. Caying",
    "Frank N. Stein",
    "Bones Rattler",
    "Carrie Coffin",
];

const ROMANCE: &[&str] = &["Val Entine", "Rose Bush", "Lovett Firstsight", "Hart Throb", "Bea Mine"];

/// Name pool for a tone.
pub fn pool_for(tone: Tone) -> &'static [&'static str] {
    match tone {
        Tone::Funny => FUNNY,
        Tone::Action => ACTION,
        Tone::Horror => HORROR,
        Tone::Romance => ROMANCE,
    }
}

/// Ordered role lists for the billing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingRoles {
    /// Director and producer only.
    #[default]
    Classic,
    /// A fuller credits block.
    Extended,
}

impl BillingRoles {
    pub fn roles(&self) -> &'static [&'static str] {
        match self {
            BillingRoles::Classic => &["DIRECTED BY", "PRODUCED BY"],
            BillingRoles::Extended => &["CO-STAR", "MUSIC", "EDITED BY", "PRODUCED BY", "DIRECTED BY"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingRoles::Classic => "classic",
            BillingRoles::Extended => "extended",
        }
    }
}

impl fmt::Display for BillingRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BillingRoles {
    type Err = poster_models::PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Ok(BillingRoles::Classic),
            "extended" | "full" => Ok(BillingRoles::Extended),
            _ => Err(poster_models::PolicyParseError::new("billing roles", s)),
        }
    }
}

/// A single credited role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEntry {
    pub role: &'static str,
    pub name: &'static str,
}

impl fmt::Display for BillingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role, self.name.to_uppercase())
    }
}

/// Shuffle `names` with `rng` and pair them with `roles` in order.
///
/// The result has `min(roles, names)` entries and never repeats a name.
pub fn select_billing<R: Rng + ?Sized>(
    names: &[&'static str],
    roles: BillingRoles,
    rng: &mut R,
) -> Vec<BillingEntry> {
    let mut shuffled = names.to_vec();
    shuffled.shuffle(rng);

    roles
        .roles()
        .iter()
        .zip(shuffled)
        .map(|(&role, name)| BillingEntry { role, name })
        .collect()
}

/// Render the billing block as a single line.
pub fn billing_line(entries: &[BillingEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("   ")
}
