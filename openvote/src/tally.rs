//! Self-tallying decoder.
//!
//! Adding every encoded vote cancels the blinding terms and leaves
//! `(yes - no) * G`. The signed sum is recovered by trying every
//! multiple of G in the feasible range, which is bounded by the
//! committee size.

use crate::*;

/// The decoded result of a session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub yes_votes: usize,
    pub no_votes: usize,
    /// yes_votes - no_votes
    pub vote_sum: i64,
}

/// Aggregate the encoded votes and decode the yes count.
///
/// Fails with `TallyUnrecoverable` when no multiple of G in
/// `[-committee, committee]` matches, or when the decoded sum's parity
/// cannot arise from the committee size. Either means a bad payload was
/// admitted; the result must never be silently defaulted.
pub fn decode_tally(ctx: &CurveContext, encoded_votes: &[Point]) -> Result<Tally, ValidationError> {
    let committee = encoded_votes.len();

    let mut product = Point::Infinity;
    for encoded in encoded_votes {
        ctx.check_point(encoded)?;
        product = ctx.add(&product, encoded);
    }

    let vote_sum = decode_vote_sum(ctx, &product, committee)?;

    // sum = yes - no and committee = yes + no, so they share parity.
    let yes = vote_sum + committee as i64;
    if yes % 2 != 0 {
        return Err(ValidationError::TallyUnrecoverable);
    }
    let yes_votes = (yes / 2) as usize;

    Ok(Tally {
        yes_votes,
        no_votes: committee - yes_votes,
        vote_sum,
    })
}

// Bounded discrete-log search over the positive range, then the
// symmetric negative range (an all-no committee sums below zero).
fn decode_vote_sum(
    ctx: &CurveContext,
    product: &Point,
    committee: usize,
) -> Result<i64, ValidationError> {
    if product.is_infinity() {
        return Ok(0);
    }

    let generator = ctx.generator();
    let mut positive = Point::Infinity;
    let mut negative = Point::Infinity;
    let negated = ctx.negate(&generator);

    for k in 1..=committee {
        positive = ctx.add(&positive, &generator);
        if positive == *product {
            return Ok(k as i64);
        }

        negative = ctx.add(&negative, &negated);
        if negative == *product {
            return Ok(-(k as i64));
        }
    }

    Err(ValidationError::TallyUnrecoverable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn context() -> CurveContext {
        CurveContext::new(DomainParameters::prime256v1()).unwrap()
    }

    fn encode(ctx: &CurveContext, k: i64) -> Point {
        ctx.scalar_mul(&BigInt::from(k), &ctx.generator())
    }

    #[test]
    fn single_yes_vote_decodes() {
        let ctx = context();
        let tally = decode_tally(&ctx, &[encode(&ctx, 1)]).unwrap();
        assert_eq!(
            tally,
            Tally {
                yes_votes: 1,
                no_votes: 0,
                vote_sum: 1
            }
        );
    }

    #[test]
    fn single_no_vote_decodes_from_the_negative_range() {
        let ctx = context();
        let tally = decode_tally(&ctx, &[encode(&ctx, -1)]).unwrap();
        assert_eq!(
            tally,
            Tally {
                yes_votes: 0,
                no_votes: 1,
                vote_sum: -1
            }
        );
    }

    #[test]
    fn even_split_sums_to_zero() {
        let ctx = context();
        let tally = decode_tally(&ctx, &[encode(&ctx, 1), encode(&ctx, -1)]).unwrap();
        assert_eq!(
            tally,
            Tally {
                yes_votes: 1,
                no_votes: 1,
                vote_sum: 0
            }
        );
    }

    #[test]
    fn unanimous_committees_decode_at_the_bounds() {
        let ctx = context();

        let all_yes: Vec<Point> = (0..3).map(|_| encode(&ctx, 1)).collect();
        assert_eq!(decode_tally(&ctx, &all_yes).unwrap().yes_votes, 3);

        let all_no: Vec<Point> = (0..3).map(|_| encode(&ctx, -1)).collect();
        let tally = decode_tally(&ctx, &all_no).unwrap();
        assert_eq!(tally.yes_votes, 0);
        assert_eq!(tally.vote_sum, -3);
    }

    #[test]
    fn out_of_range_product_is_unrecoverable() {
        let ctx = context();
        // One "ballot" worth five yes votes.
        let result = decode_tally(&ctx, &[encode(&ctx, 5)]);
        assert_eq!(result, Err(ValidationError::TallyUnrecoverable));
    }

    #[test]
    fn parity_violation_is_unrecoverable() {
        let ctx = context();
        // Two ballots that sum to 1: impossible for two +/-1 votes.
        let result = decode_tally(&ctx, &[encode(&ctx, 2), encode(&ctx, -1)]);
        assert_eq!(result, Err(ValidationError::TallyUnrecoverable));
    }

    #[test]
    fn off_curve_ballot_is_rejected() {
        let ctx = context();
        let bogus = Point::affine(BigInt::from(3u8), BigInt::from(4u8));
        assert_eq!(
            decode_tally(&ctx, &[bogus]),
            Err(ValidationError::InvalidPoint)
        );
    }
}
