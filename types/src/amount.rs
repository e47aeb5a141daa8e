//! Currency amounts.
//!
//! Amounts are non-negative integers in currency minor units. There is no
//! signed amount type: a balance that would go below zero is unrepresentable,
//! so every debit goes through [`Amount::checked_sub`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of in-app currency, in minor units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl From<u64> for Amount {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_sub_refuses_to_go_negative() {
        let balance = Amount::new(500);
        assert_eq!(balance.checked_sub(Amount::new(500)), Some(Amount::ZERO));
        assert_eq!(balance.checked_sub(Amount::new(501)), None);
    }

    #[test]
    fn checked_add_refuses_to_overflow() {
        assert_eq!(Amount::new(u64::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(Amount::new(2).checked_add(Amount::new(3)), Some(Amount::new(5)));
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&Amount::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
