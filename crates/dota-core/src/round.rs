//! The `round_div_2` helper used to split the fractional part of a clock
//! valuation into two halves without colliding with an existing digit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Picks a value strictly between `r/2` and `r`, expressed with at most one
/// more decimal digit than `r` itself.
///
/// `r` must lie in `(0, 1]`. Works on `r`'s exact decimal digit string rather
/// than on the real number `r/2`, so that e.g. `round_div_2(0.15) = 0.08`
/// rather than the unreachable-by-digit-string `0.075`.
pub fn round_div_2(r: Decimal) -> Decimal {
    debug_assert!(
        r > Decimal::ZERO && r <= Decimal::ONE,
        "round_div_2 requires r in (0,1], got {r}"
    );
    if r == Decimal::ONE {
        return Decimal::new(5, 1);
    }
    let d = r.scale();
    let n = (r * Decimal::from(10u64.pow(d)))
        .round()
        .to_u64()
        .expect("scaled numerator of a (0,1] decimal fits in u64");
    if n == 1 {
        return Decimal::new(5, d + 1);
    }
    let half = if n % 2 == 0 { n / 2 } else { (n + 1) / 2 };
    Decimal::new(half as i64, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn matches_worked_examples() {
        assert_eq!(round_div_2(Decimal::ONE), dec("0.5"));
        assert_eq!(round_div_2(dec("0.8")), dec("0.4"));
        assert_eq!(round_div_2(dec("0.5")), dec("0.3"));
        assert_eq!(round_div_2(dec("0.3")), dec("0.2"));
        assert_eq!(round_div_2(dec("0.1")), dec("0.05"));
        assert_eq!(round_div_2(dec("0.15")), dec("0.08"));
    }

    #[test]
    fn result_is_between_half_and_r() {
        // Exactly `r/2` is allowed when `r`'s last digit is 1 (or `r` is 1
        // itself): those are the cases with no odd remainder to round up.
        for s in ["0.1", "0.15", "0.3", "0.5", "0.7", "0.8", "0.99", "1"] {
            let r = dec(s);
            let out = round_div_2(r);
            assert!(out < r, "{out} should be < {r}");
            assert!(out >= r / Decimal::TWO, "{out} should be >= {}", r / Decimal::TWO);
        }
    }
}
