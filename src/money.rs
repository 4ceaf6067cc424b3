use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Tolerance under which a decimal result is treated as zero.
pub const EPSILON: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Finest minor unit a trip currency may use.
pub const MAX_CURRENCY_SCALE: u32 = 8;

/// Largest single amount (10^15) the ledger accepts. Together with
/// `MAX_CURRENCY_SCALE` this keeps minor-unit counts below 10^23 and leaves
/// room to sum billions of expenses without leaving `Decimal` range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Smallest representable amount for a currency with `scale` fractional digits.
pub fn minor_unit(scale: u32) -> Decimal {
    Decimal::new(1, scale)
}

pub fn is_zero(amount: Decimal) -> bool {
    amount.abs() <= EPSILON
}

/// Largest drift allowed between a custom split and its expense amount.
///
/// Never reaches a full minor unit, so for every currency scale a valid split
/// adds up to the expense amount exactly.
pub fn split_tolerance(scale: u32) -> Decimal {
    EPSILON.min(minor_unit(scale) / Decimal::TWO)
}

/// True when `amount` carries no more fractional digits than `scale` allows.
pub fn fits_scale(amount: Decimal, scale: u32) -> bool {
    amount.normalize().scale() <= scale
}

/// Divides `amount` into `parts` shares of whole minor units.
///
/// The shares always sum to `amount`; the leftover minor units go one each
/// to the first shares. `amount` must already fit `scale`.
pub fn split_evenly(amount: Decimal, parts: usize, scale: u32) -> Vec<Decimal> {
    if parts == 0 {
        return Vec::new();
    }
    let unit = minor_unit(scale);
    let units = (amount / unit).trunc();
    let count = Decimal::from(parts as u64);
    let base = (units / count).floor();
    let remainder = (units - base * count).to_usize().unwrap_or(0);

    (0..parts)
        .map(|idx| {
            let share = if idx < remainder { base + Decimal::ONE } else { base };
            (share * unit).round_dp(scale)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case::thirds(dec!(100), 3, 2, vec![dec!(33.34), dec!(33.33), dec!(33.33)])]
    #[case::exact(dec!(90), 3, 2, vec![dec!(30), dec!(30), dec!(30)])]
    #[case::two_left_over(dec!(0.05), 3, 2, vec![dec!(0.02), dec!(0.02), dec!(0.01)])]
    #[case::zero(dec!(0), 2, 2, vec![dec!(0), dec!(0)])]
    #[case::no_minor_units(dec!(1000), 3, 0, vec![dec!(334), dec!(333), dec!(333)])]
    fn split_evenly_cases(
        #[case] amount: Decimal,
        #[case] parts: usize,
        #[case] scale: u32,
        #[case] expected: Vec<Decimal>,
    ) {
        let shares = split_evenly(amount, parts, scale);
        assert_eq!(shares, expected);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), amount);
    }

    #[test]
    fn split_into_nothing_is_empty() {
        assert!(split_evenly(dec!(10), 0, 2).is_empty());
    }

    #[test]
    fn scale_check_ignores_trailing_zeros() {
        assert!(fits_scale(dec!(12.500), 2));
        assert!(!fits_scale(dec!(12.505), 2));
        assert!(fits_scale(dec!(12), 0));
    }

    #[test]
    fn amount_limit_is_a_quadrillion() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000_000u64));
    }

    #[rstest]
    #[case::whole_units(0, dec!(0.005))]
    #[case::cents(2, dec!(0.005))]
    #[case::mils(3, dec!(0.0005))]
    #[case::finest(MAX_CURRENCY_SCALE, dec!(0.000000005))]
    fn split_tolerance_stays_below_a_minor_unit(#[case] scale: u32, #[case] expected: Decimal) {
        assert_eq!(split_tolerance(scale), expected);
        assert!(split_tolerance(scale) < minor_unit(scale));
    }

    #[test]
    fn largest_amount_splits_at_finest_scale() {
        let shares = split_evenly(MAX_AMOUNT, 7, MAX_CURRENCY_SCALE);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), MAX_AMOUNT);
    }

    #[test]
    fn epsilon_is_half_a_cent() {
        assert_eq!(EPSILON, dec!(0.005));
        assert!(is_zero(dec!(-0.004)));
        assert!(!is_zero(dec!(0.01)));
    }
}
