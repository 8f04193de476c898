//! Per-voter blinding points.
//!
//! Given everyone's round-1 voting keys, each voter computes
//! `Y_i = sum(earlier keys) - sum(later keys)` under the lexicographic
//! order on voter ids. Across the whole committee every pairwise product
//! `x_i*x_j` then appears once positively and once negatively, so
//! `sum_i(x_i * y_i) = 0` and the round-2 blinding terms cancel out of
//! the tally. Every party must use the same id order or the cancellation
//! breaks.

use crate::*;

use std::collections::BTreeMap;

/// Compute this voter's blinding point from the full round-1 key set.
///
/// Sides with no contributing peer stay absent rather than becoming the
/// neutral element, which keeps the first and last voter in the order
/// correct. A committee of one has no peers at all; its blinding point
/// is infinity and its encoded vote degenerates to `v*G`.
pub fn blinding_point(
    ctx: &CurveContext,
    voting_keys: &BTreeMap<String, Point>,
    self_id: &str,
) -> Result<Point, ValidationError> {
    let mut dividend: Option<Point> = None;
    let mut divisor: Option<Point> = None;

    for (voter_id, key) in voting_keys {
        if voter_id == self_id {
            continue;
        }
        ctx.check_point(key)?;

        if voter_id.as_str() < self_id {
            dividend = Some(match dividend {
                None => key.clone(),
                Some(sum) => ctx.add(&sum, key),
            });
        } else {
            divisor = Some(match divisor {
                None => ctx.negate(key),
                Some(sum) => ctx.add(&sum, &ctx.negate(key)),
            });
        }
    }

    Ok(match (dividend, divisor) {
        (Some(dividend), Some(divisor)) => ctx.add(&dividend, &divisor),
        (Some(dividend), None) => dividend,
        (None, Some(divisor)) => divisor,
        (None, None) => Point::Infinity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_integer::Integer;
    use num_traits::Zero;

    fn context() -> CurveContext {
        CurveContext::new(DomainParameters::prime256v1()).unwrap()
    }

    // Rebuild the blinding discrete logs from the private scalars and
    // check the committee-wide cancellation algebraically.
    fn assert_cancellation(scalars: &[(&str, u32)]) {
        let ctx = context();

        let mut keys = BTreeMap::new();
        for (id, x) in scalars {
            keys.insert(
                id.to_string(),
                ctx.scalar_mul(&BigInt::from(*x), &ctx.generator()),
            );
        }

        let mut sum = BigInt::zero();
        for (id, x) in scalars {
            // y_i = sum(earlier x_j) - sum(later x_j), in the clear
            let mut y = BigInt::zero();
            for (other, xj) in scalars {
                if other < id {
                    y += BigInt::from(*xj);
                } else if other > id {
                    y -= BigInt::from(*xj);
                }
            }

            let expected = ctx.scalar_mul(&y, &ctx.generator());
            let actual = blinding_point(&ctx, &keys, id).unwrap();
            assert_eq!(actual, expected, "blinding point mismatch for {}", id);

            sum += BigInt::from(*x) * y;
        }

        assert!(sum.mod_floor(ctx.order()).is_zero());
    }

    #[test]
    fn pairwise_products_cancel_for_two_voters() {
        assert_cancellation(&[("a", 5), ("b", 11)]);
    }

    #[test]
    fn pairwise_products_cancel_for_three_voters() {
        assert_cancellation(&[("a", 3), ("b", 7), ("c", 13)]);
    }

    #[test]
    fn pairwise_products_cancel_for_five_voters() {
        assert_cancellation(&[("a", 2), ("b", 3), ("c", 5), ("d", 7), ("e", 11)]);
    }

    #[test]
    fn first_voter_sees_only_negated_later_keys() {
        let ctx = context();
        let mut keys = BTreeMap::new();
        let two_g = ctx.scalar_mul(&BigInt::from(2u8), &ctx.generator());
        keys.insert("a".to_string(), ctx.generator());
        keys.insert("b".to_string(), two_g.clone());

        let y_a = blinding_point(&ctx, &keys, "a").unwrap();
        assert_eq!(y_a, ctx.negate(&two_g));

        let y_b = blinding_point(&ctx, &keys, "b").unwrap();
        assert_eq!(y_b, ctx.generator());
    }

    #[test]
    fn lone_voter_gets_infinity() {
        let ctx = context();
        let mut keys = BTreeMap::new();
        keys.insert("a".to_string(), ctx.generator());
        let y = blinding_point(&ctx, &keys, "a").unwrap();
        assert!(y.is_infinity());
    }

    #[test]
    fn off_curve_peer_key_is_rejected() {
        let ctx = context();
        let mut keys = BTreeMap::new();
        keys.insert("a".to_string(), ctx.generator());
        keys.insert(
            "b".to_string(),
            Point::affine(BigInt::from(1u8), BigInt::from(1u8)),
        );
        assert_eq!(
            blinding_point(&ctx, &keys, "a"),
            Err(ValidationError::InvalidPoint)
        );
    }
}
