use serde::{Deserialize, Serialize};

use vertobank_core::{Component, DomainError, DomainResult, ValueObject};

const MINOR_UNITS_PER_UNIT: i64 = 100;

/// Positive amount in the smallest currency unit (e.g. cents).
///
/// Stored and serialized as the plain integer; deserialization re-validates.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price {
    minor_units: i64,
}

impl Price {
    pub fn from_minor_units(minor_units: i64) -> DomainResult<Self> {
        if minor_units <= 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        Ok(Self { minor_units })
    }

    /// Convert a decimal amount (e.g. `12.5`), rounding to the nearest minor unit.
    pub fn from_decimal(amount: f64) -> DomainResult<Self> {
        if !amount.is_finite() {
            return Err(DomainError::validation("price must be a finite number"));
        }
        let minor = (amount * MINOR_UNITS_PER_UNIT as f64).round();
        if minor > i64::MAX as f64 {
            return Err(DomainError::validation("price is too large"));
        }
        Self::from_minor_units(minor as i64)
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn as_decimal(&self) -> f64 {
        self.minor_units as f64 / MINOR_UNITS_PER_UNIT as f64
    }
}

impl ValueObject for Price {
    fn equality_components(&self) -> Vec<Component> {
        vec![self.minor_units.into()]
    }
}

vertobank_core::impl_value_eq!(Price);

impl TryFrom<i64> for Price {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_minor_units(value)
    }
}

impl From<Price> for i64 {
    fn from(value: Price) -> Self {
        value.minor_units
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.minor_units / MINOR_UNITS_PER_UNIT,
            self.minor_units % MINOR_UNITS_PER_UNIT
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_zero_and_negative_amounts() {
        assert!(Price::from_minor_units(0).is_err());
        assert!(Price::from_minor_units(-5).is_err());
        assert!(Price::from_decimal(0.0).is_err());
        assert!(Price::from_decimal(-1.0).is_err());
        assert!(Price::from_decimal(f64::NAN).is_err());
        assert!(Price::from_decimal(f64::INFINITY).is_err());
    }

    #[test]
    fn decimals_round_to_minor_units() {
        assert_eq!(Price::from_decimal(12.5).unwrap().minor_units(), 1250);
        assert_eq!(Price::from_decimal(19.99).unwrap().minor_units(), 1999);
        assert_eq!(Price::from_decimal(0.004).unwrap_err(), DomainError::validation("price must be positive"));
        assert_eq!(Price::from_minor_units(1999).unwrap().to_string(), "19.99");
        assert_eq!(Price::from_minor_units(5).unwrap().to_string(), "0.05");
    }

    #[test]
    fn serializes_as_integer_and_revalidates() {
        let price = Price::from_minor_units(250).unwrap();
        assert_eq!(serde_json::to_value(price).unwrap(), serde_json::json!(250));
        assert_eq!(serde_json::from_value::<Price>(serde_json::json!(250)).unwrap(), price);
        assert!(serde_json::from_value::<Price>(serde_json::json!(0)).is_err());
    }

    proptest! {
        #[test]
        fn equality_is_structural(a in 1i64..1_000_000, b in 1i64..1_000_000) {
            let left = Price::from_minor_units(a).unwrap();
            let right = Price::from_minor_units(b).unwrap();
            prop_assert_eq!(left == right, a == b);
            prop_assert_eq!(Price::from_decimal(left.as_decimal()).unwrap(), left);
        }
    }
}
