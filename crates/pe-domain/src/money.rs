//! Money value object: fixed-point currency amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// A currency amount, stored as a `Decimal` to avoid floating-point drift
/// across cost aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn from_decimal(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_additive_identity() {
        let m = Money::from_decimal(Decimal::new(1250, 2));
        assert_eq!(m + Money::ZERO, m);
    }

    #[test]
    fn sums_across_iterator() {
        let costs = vec![
            Money::from_decimal(Decimal::new(125, 2)),
            Money::from_decimal(Decimal::new(275, 2)),
            Money::from_decimal(Decimal::new(50, 2)),
        ];
        let total: Money = costs.into_iter().sum();
        assert_eq!(total, Money::from_decimal(Decimal::new(450, 2)));
    }
}
