//! Round 2: vote encoding and the disjunctive vote-validity proof.
//!
//! A vote is one bit, encoded against the blinding point as
//! `E = x*Y + v*G` with `v = +1` (yes) or `v = -1` (no). The attached
//! 1-of-2 proof shows that `E` is one of exactly those two values
//! without revealing which: the branch matching the real vote is proved
//! honestly, the other branch is simulated from a free challenge share,
//! and the two shares are tied together by the Fiat-Shamir challenges of
//! both branches.

use crate::*;

use num_bigint::BigInt;
use num_integer::Integer;
use rand::Rng;

/// A ballot choice.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Yes,
    No,
}

impl Vote {
    /// The exponent the choice contributes to the encoded vote.
    pub fn encoding(self) -> BigInt {
        match self {
            Vote::Yes => BigInt::from(1),
            Vote::No => BigInt::from(-1),
        }
    }
}

/// The 1-of-2 proof carried by a round-2 payload.
///
/// Branch statements `b_yes`/`b_no` are the two candidate unblindings of
/// the encoded vote; each branch carries a commitment pair and a
/// challenge/response pair, one branch honest and one simulated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisjunctiveProof {
    pub b_yes: Point,
    pub b_no: Point,
    pub a1_yes: Point,
    pub a2_yes: Point,
    pub a1_no: Point,
    pub a2_no: Point,

    #[serde(with = "crate::serde_bigint")]
    pub d_yes: BigInt,
    #[serde(with = "crate::serde_bigint")]
    pub d_no: BigInt,
    #[serde(with = "crate::serde_bigint")]
    pub r_yes: BigInt,
    #[serde(with = "crate::serde_bigint")]
    pub r_no: BigInt,
}

/// A voter's round-2 artifact.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Round2Payload {
    pub voter_id: String,
    pub encoded_vote: Point,
    pub proof: DisjunctiveProof,
}

/// Encode a vote: `E = x*Y + v*G`.
pub fn encode_vote(ctx: &CurveContext, keypair: &KeyPair, blinding: &Point, vote: Vote) -> Point {
    let blinded = ctx.scalar_mul(keypair.private_scalar(), blinding);
    let vote_term = ctx.scalar_mul(&vote.encoding(), &ctx.generator());
    ctx.add(&blinded, &vote_term)
}

// One branch's worth of proof data, before the challenge shares are
// fixed.
struct Branch {
    a1: Point,
    a2: Point,
}

impl Round2Payload {
    /// Build the encoded vote and its disjunctive proof.
    pub fn build<R: Rng + ?Sized>(
        ctx: &CurveContext,
        keypair: &KeyPair,
        blinding: &Point,
        vote: Vote,
        voter_id: &str,
        rng: &mut R,
    ) -> Self {
        let generator = ctx.generator();
        let x = keypair.private_scalar();

        let encoded_vote = encode_vote(ctx, keypair, blinding, vote);
        let b_yes = ctx.add(&encoded_vote, &ctx.negate(&generator));
        let b_no = ctx.add(&encoded_vote, &generator);

        // Honest branch: plain commitments to a fresh witness.
        let w = ctx.random_scalar(rng);
        let honest = Branch {
            a1: ctx.scalar_mul(&w, &generator),
            a2: ctx.scalar_mul(&w, blinding),
        };

        // Simulated branch: pick the challenge share and response first,
        // then back-solve commitments that will satisfy the verifier.
        let d_sim = ctx.random_scalar(rng);
        let r_sim = ctx.random_scalar(rng);
        let b_sim = match vote {
            Vote::Yes => &b_no,
            Vote::No => &b_yes,
        };
        let simulated = Branch {
            a1: ctx.add(
                &ctx.scalar_mul(&r_sim, &generator),
                &ctx.negate(&ctx.scalar_mul(&d_sim, keypair.public_point())),
            ),
            a2: ctx.add(
                &ctx.scalar_mul(&r_sim, blinding),
                &ctx.negate(&ctx.scalar_mul(&d_sim, b_sim)),
            ),
        };

        let (yes_branch, no_branch) = match vote {
            Vote::Yes => (&honest, &simulated),
            Vote::No => (&simulated, &honest),
        };

        let c_yes = hash::challenge(ctx, &[&b_yes, &yes_branch.a1, &yes_branch.a2]);
        let c_no = hash::challenge(ctx, &[&b_no, &no_branch.a1, &no_branch.a2]);
        let c = (c_yes + c_no).mod_floor(ctx.order());

        // Close the honest branch with whatever challenge share is left.
        let d_honest = (&c - &d_sim).mod_floor(ctx.order());
        let r_honest = (&w + x * &d_honest).mod_floor(ctx.order());

        let (d_yes, r_yes, d_no, r_no) = match vote {
            Vote::Yes => (d_honest, r_honest, d_sim, r_sim),
            Vote::No => (d_sim, r_sim, d_honest, r_honest),
        };

        Round2Payload {
            voter_id: voter_id.to_string(),
            encoded_vote,
            proof: DisjunctiveProof {
                b_yes,
                b_no,
                a1_yes: yes_branch.a1.clone(),
                a2_yes: yes_branch.a2.clone(),
                a1_no: no_branch.a1.clone(),
                a2_no: no_branch.a2.clone(),
                d_yes,
                d_no,
                r_yes,
                r_no,
            },
        }
    }

    /// Verify the proof against the voter's round-1 voting key and its
    /// blinding point (both computed locally by the verifier).
    ///
    /// Checks, in order: point validity, that the branch statements are
    /// pinned to the encoded vote, that the challenge shares add up to
    /// the recomputed branch challenges, and both branch equation pairs.
    pub fn verify(
        &self,
        ctx: &CurveContext,
        voting_key: &Point,
        blinding: &Point,
    ) -> Result<(), ValidationError> {
        let generator = ctx.generator();
        let proof = &self.proof;

        ctx.check_point(voting_key)?;
        ctx.check_point(&self.encoded_vote)?;
        for commitment in [&proof.a1_yes, &proof.a2_yes, &proof.a1_no, &proof.a2_no] {
            if !ctx.is_on_curve(commitment) {
                return Err(ValidationError::InvalidPoint);
            }
        }

        // b_yes and b_no must be the two candidate unblindings of E.
        if proof.b_yes != ctx.add(&self.encoded_vote, &ctx.negate(&generator))
            || proof.b_no != ctx.add(&self.encoded_vote, &generator)
        {
            return Err(ValidationError::ProofVerificationFailed(
                self.voter_id.clone(),
            ));
        }

        // d_yes + d_no must equal the combined branch challenges.
        let c_yes = hash::challenge(ctx, &[&proof.b_yes, &proof.a1_yes, &proof.a2_yes]);
        let c_no = hash::challenge(ctx, &[&proof.b_no, &proof.a1_no, &proof.a2_no]);
        let c = (c_yes + c_no).mod_floor(ctx.order());
        if (&proof.d_yes + &proof.d_no).mod_floor(ctx.order()) != c {
            return Err(ValidationError::MalformedChallenge(self.voter_id.clone()));
        }

        // Branch equations: r_k*G == a1_k + d_k*X and
        // r_k*Y == a2_k + d_k*b_k for both branches.
        let branches = [
            (&proof.r_yes, &proof.d_yes, &proof.a1_yes, &proof.a2_yes, &proof.b_yes),
            (&proof.r_no, &proof.d_no, &proof.a1_no, &proof.a2_no, &proof.b_no),
        ];
        for (r, d, a1, a2, b) in branches {
            let key_lhs = ctx.scalar_mul(r, &generator);
            let key_rhs = ctx.add(a1, &ctx.scalar_mul(d, voting_key));
            if key_lhs != key_rhs {
                return Err(ValidationError::ProofVerificationFailed(
                    self.voter_id.clone(),
                ));
            }

            let blinding_lhs = ctx.scalar_mul(r, blinding);
            let blinding_rhs = ctx.add(a2, &ctx.scalar_mul(d, b));
            if blinding_lhs != blinding_rhs {
                return Err(ValidationError::ProofVerificationFailed(
                    self.voter_id.clone(),
                ));
            }
        }

        Ok(())
    }
}
