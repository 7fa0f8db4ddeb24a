//! Curve functions mapping raw engagement weight to a claim on the fund.
//!
//! ```text
//! linear                   f(w) = w
//! quadratic, bounded       f(w) = w² / (w + c)
//! square_root              f(w) = ⌊√w⌋
//! convergent_linear        f(w) = w·R / (R + w)
//! convergent_square_root   f(w) = g·R / (R + g),  g = ⌊√w⌋
//! ```
//!
//! `c` is the fund's content constant and `R` its recent claims after decay.
//! Convergent shapes need history, so fresh convergent funds are seeded. Every
//! shape is non-decreasing in `w` and never exceeds `w` (except `square_root`
//! below `w = 1`, where both are zero).

use alloy_primitives::U256;
use sst_protocol::CurveId;

/// Shaped weight of `weight` under `curve`.
pub fn evaluate_reward_curve(
    weight: u128,
    curve: CurveId,
    content_constant: u128,
    recent_claims: u128,
) -> u128 {
    match curve {
        CurveId::Linear => weight,
        CurveId::Quadratic | CurveId::Bounded => quadratic(weight, content_constant),
        CurveId::SquareRoot => weight.isqrt(),
        CurveId::ConvergentLinear => convergent(weight, recent_claims),
        CurveId::ConvergentSquareRoot => convergent(weight.isqrt(), recent_claims),
    }
}

fn quadratic(weight: u128, content_constant: u128) -> u128 {
    let w = U256::from(weight);
    let denom = w + U256::from(content_constant);
    if denom.is_zero() {
        return 0;
    }
    narrow(w * w / denom)
}

fn convergent(g: u128, recent_claims: u128) -> u128 {
    let (g, r) = (U256::from(g), U256::from(recent_claims));
    let denom = g + r;
    if denom.is_zero() {
        return 0;
    }
    narrow(g * r / denom)
}

/// `value * numerator / denominator` without intermediate overflow. Zero when
/// the denominator is zero.
pub fn mul_div(value: u128, numerator: u128, denominator: u128) -> u128 {
    if denominator == 0 {
        return 0;
    }
    narrow(U256::from(value) * U256::from(numerator) / U256::from(denominator))
}

pub(crate) fn narrow(value: U256) -> u128 {
    u128::try_from(value).unwrap_or(u128::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    const C: u128 = sst_protocol::constants::CONTENT_CONSTANT;

    #[test]
    fn test_reference_points() {
        assert_eq!(evaluate_reward_curve(1_000, CurveId::Linear, C, 0), 1_000);
        assert_eq!(evaluate_reward_curve(1_000_000, CurveId::SquareRoot, C, 0), 1_000);
        assert_eq!(evaluate_reward_curve(99, CurveId::SquareRoot, C, 0), 9);
        // w = c gives w / 2
        assert_eq!(evaluate_reward_curve(C, CurveId::Quadratic, C, 0), C / 2);
        assert_eq!(evaluate_reward_curve(100, CurveId::ConvergentLinear, C, 100), 50);
        assert_eq!(evaluate_reward_curve(10_000, CurveId::ConvergentSquareRoot, C, 100), 50);
    }

    #[test]
    fn test_degenerate_inputs() {
        for curve in CurveId::iter() {
            assert_eq!(evaluate_reward_curve(0, curve, C, 1_000), 0, "{curve}");
        }
        assert_eq!(evaluate_reward_curve(0, CurveId::Quadratic, 0, 0), 0);
        // no history, nothing to converge against
        assert_eq!(evaluate_reward_curve(500, CurveId::ConvergentLinear, C, 0), 0);
    }

    #[test]
    fn test_wide_inputs_do_not_overflow() {
        let w = u128::MAX;
        assert!(evaluate_reward_curve(w, CurveId::Quadratic, u128::MAX, 0) <= w);
        assert!(evaluate_reward_curve(w, CurveId::ConvergentLinear, 0, u128::MAX) <= w);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), u128::MAX);
        assert_eq!(mul_div(5, 7, 0), 0);
    }

    proptest! {
        #[test]
        fn curves_are_monotonic(
            a in any::<u128>(),
            b in any::<u128>(),
            c in any::<u64>(),
            recent in any::<u128>(),
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for curve in CurveId::iter() {
                let flo = evaluate_reward_curve(lo, curve, u128::from(c), recent);
                let fhi = evaluate_reward_curve(hi, curve, u128::from(c), recent);
                prop_assert!(
                    flo <= fhi,
                    "{} not monotonic: f({}) = {} > f({}) = {}",
                    curve, lo, flo, hi, fhi
                );
            }
        }

        #[test]
        fn curves_never_exceed_weight(
            w in any::<u128>(),
            c in any::<u64>(),
            recent in any::<u128>(),
        ) {
            for curve in CurveId::iter() {
                prop_assert!(evaluate_reward_curve(w, curve, u128::from(c), recent) <= w);
            }
        }
    }
}
