use crate::error::LedgerError;
use core_types::{FeeBreakdown, Side};
use rust_decimal::Decimal;

/// Brokerage fee and transaction tax rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    fee_rate: Decimal,
    tax_rate: Decimal,
}

impl FeeSchedule {
    pub fn new(fee_rate: Decimal, tax_rate: Decimal) -> Result<Self, LedgerError> {
        for (name, value) in [("fee_rate", fee_rate), ("tax_rate", tax_rate)] {
            if value < Decimal::ZERO || value >= Decimal::ONE {
                return Err(LedgerError::InvalidRate { name, value: value.to_string() });
            }
        }
        Ok(Self { fee_rate, tax_rate })
    }

    /// Prices an order. Fee and tax are floored to whole currency units; tax is
    /// only charged on sells. The caller validates that price and shares are positive.
    ///
    /// Returns `None` when the gross amount or the order total does not fit in
    /// a `Decimal`.
    pub fn quote(&self, price: Decimal, shares: u64, side: Side) -> Option<FeeBreakdown> {
        let gross = price.checked_mul(Decimal::from(shares))?;
        let fee = gross.checked_mul(self.fee_rate)?.floor();
        let tax = match side {
            Side::Sell => gross.checked_mul(self.tax_rate)?.floor(),
            Side::Buy => Decimal::ZERO,
        };
        gross.checked_add(fee)?.checked_add(tax)?;
        Some(FeeBreakdown { gross, fee, tax })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn schedule() -> FeeSchedule {
        FeeSchedule::new(dec!(0.001425), dec!(0.003)).unwrap()
    }

    #[test]
    fn buy_pays_fee_but_no_tax() {
        let costs = schedule().quote(dec!(100), 1000, Side::Buy).unwrap();
        assert_eq!(costs.gross, dec!(100000));
        assert_eq!(costs.fee, dec!(142));
        assert_eq!(costs.tax, dec!(0));
    }

    #[test]
    fn sell_pays_fee_and_tax_floored() {
        let costs = schedule().quote(dec!(110), 1000, Side::Sell).unwrap();
        assert_eq!(costs.gross, dec!(110000));
        assert_eq!(costs.fee, dec!(156));
        assert_eq!(costs.tax, dec!(330));
    }

    #[test]
    fn small_odd_lot_fee_floors_to_zero() {
        let costs = schedule().quote(dec!(25.5), 2, Side::Buy).unwrap();
        assert_eq!(costs.gross, dec!(51.0));
        assert_eq!(costs.fee, dec!(0));
    }

    #[test]
    fn amounts_beyond_decimal_range_are_refused() {
        assert_eq!(schedule().quote(dec!(10000000000000000000000000), 10_000, Side::Buy), None);
        assert_eq!(schedule().quote(Decimal::MAX, 2, Side::Sell), None);
        assert!(schedule().quote(dec!(100000000000000000000), 1000, Side::Buy).is_some());
    }

    #[test]
    fn rates_outside_unit_interval_are_rejected() {
        assert!(FeeSchedule::new(dec!(-0.1), dec!(0.003)).is_err());
        assert!(FeeSchedule::new(dec!(0.001), dec!(1)).is_err());
    }
}
