//! Platform and gateway fee computation.

use crate::config::FeesConfig;
use crate::error::PaymentError;
use crate::payments::payment::{Currency, FeeBreakdown};
use rust_decimal::{Decimal, RoundingStrategy};

/// Fee schedule: a platform percentage plus the gateway's percentage and
/// fixed component. Currency-agnostic in this design, though the schedule
/// is injected so per-currency schedules can be configured later.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    pub platform_fee_percent: Decimal,
    pub gateway_fee_percent: Decimal,
    pub gateway_fee_fixed: Decimal,
}

impl From<&FeesConfig> for FeeSchedule {
    fn from(config: &FeesConfig) -> Self {
        Self {
            platform_fee_percent: config.platform_fee_percent,
            gateway_fee_percent: config.gateway_fee_percent,
            gateway_fee_fixed: config.gateway_fee_fixed,
        }
    }
}

/// Pure fee calculator. Same inputs always produce the same breakdown.
#[derive(Debug, Clone)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    /// Split a gross amount into platform fee, gateway fee, and net payout.
    ///
    /// Fees are rounded half-up to the currency's two decimal places; the
    /// net amount is the exact remainder, so the three parts always sum
    /// back to the gross amount.
    pub fn compute(&self, amount: Decimal, _currency: Currency) -> Result<FeeBreakdown, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }

        let platform_fee = round_to_cents(amount * self.schedule.platform_fee_percent);
        let gateway_fee = round_to_cents(
            amount * self.schedule.gateway_fee_percent + self.schedule.gateway_fee_fixed,
        );
        let net_amount = amount - platform_fee - gateway_fee;

        Ok(FeeBreakdown {
            platform_fee,
            gateway_fee,
            net_amount,
        })
    }
}

fn round_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn calculator() -> FeeCalculator {
        FeeCalculator::new(FeeSchedule {
            platform_fee_percent: dec!(0.05),
            gateway_fee_percent: dec!(0.029),
            gateway_fee_fixed: dec!(0.30),
        })
    }

    #[test]
    fn splits_a_typical_donation() {
        let fees = calculator().compute(dec!(25.00), Currency::Usd).unwrap();
        assert_eq!(fees.platform_fee, dec!(1.25));
        // 25.00 * 0.029 + 0.30 = 1.025, rounded half-up
        assert_eq!(fees.gateway_fee, dec!(1.03));
        assert_eq!(fees.net_amount, dec!(22.72));
    }

    #[test]
    fn parts_sum_to_gross_for_all_currencies() {
        let calc = calculator();
        for currency in Currency::ALL {
            for amount in [
                currency.minimum_amount(),
                dec!(1.00),
                dec!(9.99),
                dec!(25.00),
                dec!(123.45),
                dec!(10000.00),
            ] {
                let fees = calc.compute(amount, currency).unwrap();
                assert_eq!(
                    fees.platform_fee + fees.gateway_fee + fees.net_amount,
                    amount,
                    "sum mismatch for {} {}",
                    amount,
                    currency
                );
            }
        }
    }

    #[test]
    fn net_is_nonnegative_for_everyday_amounts() {
        let calc = calculator();
        for currency in Currency::ALL {
            for amount in [dec!(1.00), dec!(5.00), dec!(50.00), dec!(500.00)] {
                let fees = calc.compute(amount, currency).unwrap();
                assert!(
                    fees.net_amount >= Decimal::ZERO,
                    "negative net for {} {}",
                    amount,
                    currency
                );
            }
        }
    }

    #[test]
    fn net_dips_negative_at_the_gbp_minimum() {
        // The fixed gateway fee component dominates a minimum-sized GBP
        // charge; the breakdown is still exact and sums to the gross.
        let fees = calculator().compute(dec!(0.30), Currency::Gbp).unwrap();
        assert_eq!(fees.platform_fee, dec!(0.02));
        assert_eq!(fees.gateway_fee, dec!(0.31));
        assert_eq!(fees.net_amount, dec!(-0.03));
        assert_eq!(
            fees.platform_fee + fees.gateway_fee + fees.net_amount,
            dec!(0.30)
        );
    }

    #[test]
    fn deterministic_across_invocations() {
        let calc = calculator();
        let first = calc.compute(dec!(20.00), Currency::Usd).unwrap();
        for _ in 0..10 {
            assert_eq!(calc.compute(dec!(20.00), Currency::Usd).unwrap(), first);
        }
    }

    #[test]
    fn rejects_zero_and_negative_amounts() {
        let calc = calculator();
        assert!(matches!(
            calc.compute(dec!(0), Currency::Usd),
            Err(PaymentError::Validation(_))
        ));
        assert!(matches!(
            calc.compute(dec!(-5.00), Currency::Usd),
            Err(PaymentError::Validation(_))
        ));
    }
}
