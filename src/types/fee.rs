use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A gas price preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeTier {
    /// Fastest inclusion.
    Rapid,
    /// Inclusion within a few blocks.
    #[default]
    Fast,
    /// Cheapest feed price.
    Standard,
    /// A price entered by the user. Never overwritten by feed updates.
    Custom,
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rapid => "rapid",
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::Custom => "custom",
        })
    }
}

impl FromStr for FeeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rapid" => Ok(Self::Rapid),
            "fast" => Ok(Self::Fast),
            "standard" => Ok(Self::Standard),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown fee tier: {other}")),
        }
    }
}

/// Live gas prices, in wei, published by a fee feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasTiers {
    /// Price for [`FeeTier::Rapid`].
    pub rapid: u128,
    /// Price for [`FeeTier::Fast`].
    pub fast: u128,
    /// Price for [`FeeTier::Standard`].
    pub standard: u128,
}

impl GasTiers {
    /// Creates a set of tiers.
    pub const fn new(rapid: u128, fast: u128, standard: u128) -> Self {
        Self { rapid, fast, standard }
    }

    /// Returns the price of a feed tier, or `None` for [`FeeTier::Custom`].
    pub const fn price(&self, tier: FeeTier) -> Option<u128> {
        match tier {
            FeeTier::Rapid => Some(self.rapid),
            FeeTier::Fast => Some(self.fast),
            FeeTier::Standard => Some(self.standard),
            FeeTier::Custom => None,
        }
    }
}
