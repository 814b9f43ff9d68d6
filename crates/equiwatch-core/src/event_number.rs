use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A validated, positive event identifier ("numero" in the upstream source).
///
/// Boundary behavior (spec §8): zero and negative numbers are rejected
/// before they ever reach the core — construction is the only way to
/// obtain one, so an `EventNumber` in hand is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EventNumber(i64);

impl EventNumber {
    pub fn new(value: i64) -> Result<Self, CoreError> {
        if value <= 0 {
            return Err(CoreError::InvalidEventNumber(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for EventNumber {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventNumber> for i64 {
    fn from(value: EventNumber) -> Self {
        value.0
    }
}

impl fmt::Display for EventNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventNumber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .parse()
            .map_err(|_| CoreError::InvalidEventNumber(0))?;
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_negative() {
        assert!(EventNumber::new(0).is_err());
        assert!(EventNumber::new(-5).is_err());
    }

    #[test]
    fn accepts_positive() {
        assert_eq!(EventNumber::new(123456).unwrap().get(), 123456);
    }
}
