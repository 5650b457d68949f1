// ABOUTME: Blue/green deployment colors.
// ABOUTME: Exactly one color serves production traffic; the other is the deploy target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the two symbolic deployment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentTarget {
    Blue,
    Green,
}

impl DeploymentTarget {
    /// The other color.
    pub fn opposite(self) -> Self {
        match self {
            DeploymentTarget::Blue => DeploymentTarget::Green,
            DeploymentTarget::Green => DeploymentTarget::Blue,
        }
    }

    /// Label value used in selectors and deployment names.
    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentTarget::Blue => "blue",
            DeploymentTarget::Green => "green",
        }
    }

    /// Color to deploy into, given the color currently serving traffic.
    ///
    /// With no active color (first release) the deploy goes to blue.
    pub fn inactive_for(active: Option<Self>) -> Self {
        active.map_or(DeploymentTarget::Blue, Self::opposite)
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown deployment color: '{0}' (expected 'blue' or 'green')")]
pub struct ParseColorError(pub String);

impl FromStr for DeploymentTarget {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "blue" => Ok(DeploymentTarget::Blue),
            "green" => Ok(DeploymentTarget::Green),
            other => Err(ParseColorError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_label_values() {
        assert_eq!("blue".parse::<DeploymentTarget>().unwrap(), DeploymentTarget::Blue);
        assert_eq!(" green\n".parse::<DeploymentTarget>().unwrap(), DeploymentTarget::Green);
        assert!("Blue".parse::<DeploymentTarget>().is_err());
        assert!("".parse::<DeploymentTarget>().is_err());
    }

    #[test]
    fn first_release_targets_blue() {
        assert_eq!(DeploymentTarget::inactive_for(None), DeploymentTarget::Blue);
        assert_eq!(
            DeploymentTarget::inactive_for(Some(DeploymentTarget::Blue)),
            DeploymentTarget::Green
        );
    }

    fn any_color() -> impl Strategy<Value = DeploymentTarget> {
        prop_oneof![Just(DeploymentTarget::Blue), Just(DeploymentTarget::Green)]
    }

    proptest! {
        #[test]
        fn opposite_is_an_involution(color in any_color()) {
            prop_assert_ne!(color.opposite(), color);
            prop_assert_eq!(color.opposite().opposite(), color);
        }
    }
}
