//! Round 1: key commitment with a Schnorr proof of knowledge.
//!
//! Each voter publishes its voting key together with a proof that it
//! knows the key's discrete log. This pins every voter to a private
//! scalar before any round-2 information exists, so nobody can choose a
//! key adaptively after seeing the others'.

use crate::*;

use num_bigint::BigInt;
use num_integer::Integer;
use rand::Rng;

/// Schnorr proof of knowledge of the voting key's discrete log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SchnorrProof {
    /// Commitment R = r*G
    pub commitment: Point,

    /// Response s = r + x*c (mod n)
    #[serde(with = "crate::serde_bigint")]
    pub response: BigInt,
}

/// A voter's round-1 artifact, broadcast to the coordinator and thence
/// to every voter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Round1Payload {
    pub voter_id: String,
    pub voting_key: Point,
    pub proof: SchnorrProof,
}

/// Draw the commitment scalar r.
pub fn pick_commitment_scalar<R: Rng + ?Sized>(ctx: &CurveContext, rng: &mut R) -> BigInt {
    ctx.random_scalar(rng)
}

/// Commitment R = r*G.
pub fn commit(ctx: &CurveContext, r: &BigInt) -> Point {
    ctx.scalar_mul(r, &ctx.generator())
}

/// Response s = r + x*c (mod n).
pub fn respond(ctx: &CurveContext, private_scalar: &BigInt, challenge: &BigInt, r: &BigInt) -> BigInt {
    (r + private_scalar * challenge).mod_floor(ctx.order())
}

impl Round1Payload {
    /// Build this voter's payload: the voting key plus the Schnorr proof
    /// with challenge `c = H(params, X, R)`.
    pub fn build(ctx: &CurveContext, keypair: &KeyPair, voter_id: &str, r: &BigInt) -> Self {
        let commitment = commit(ctx, r);
        let c = hash::challenge(ctx, &[keypair.public_point(), &commitment]);
        let response = respond(ctx, keypair.private_scalar(), &c, r);

        Round1Payload {
            voter_id: voter_id.to_string(),
            voting_key: keypair.public_point().clone(),
            proof: SchnorrProof {
                commitment,
                response,
            },
        }
    }

    /// Verify the proof: recompute the challenge and check
    /// `s*G == R + c*X`. No side effects; the session treats a failure
    /// as fatal.
    pub fn verify(&self, ctx: &CurveContext) -> Result<(), ValidationError> {
        ctx.check_point(&self.voting_key)?;
        ctx.check_point(&self.proof.commitment)?;

        let c = hash::challenge(ctx, &[&self.voting_key, &self.proof.commitment]);
        let lhs = ctx.scalar_mul(&self.proof.response, &ctx.generator());
        let rhs = ctx.add(
            &self.proof.commitment,
            &ctx.scalar_mul(&c, &self.voting_key),
        );

        if lhs != rhs {
            return Err(ValidationError::ProofVerificationFailed(
                self.voter_id.clone(),
            ));
        }
        Ok(())
    }
}
