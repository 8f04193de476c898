use crate::*;

use num_bigint::BigInt;
use rand::Rng;

/// A voter's session key pair: `public_point = private_scalar * G`.
///
/// Generated once per session. The private scalar never leaves the voter
/// process; the type deliberately has no `Serialize` impl.
#[derive(Debug, Clone)]
pub struct KeyPair {
    private_scalar: BigInt,
    public_point: Point,
}

impl KeyPair {
    pub fn generate<R: Rng + ?Sized>(ctx: &CurveContext, rng: &mut R) -> Self {
        let private_scalar = ctx.random_scalar(rng);
        let public_point = ctx.scalar_mul(&private_scalar, &ctx.generator());
        KeyPair {
            private_scalar,
            public_point,
        }
    }

    pub fn public_point(&self) -> &Point {
        &self.public_point
    }

    pub(crate) fn private_scalar(&self) -> &BigInt {
        &self.private_scalar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn public_point_matches_private_scalar() {
        let ctx = CurveContext::new(DomainParameters::prime256v1()).unwrap();
        let keypair = KeyPair::generate(&ctx, &mut rand::rngs::OsRng);

        assert!(ctx.is_on_curve(keypair.public_point()));
        assert!(!keypair.public_point().is_infinity());
        assert!(keypair.private_scalar() >= &BigInt::one());
        assert_eq!(
            ctx.scalar_mul(keypair.private_scalar(), &ctx.generator()),
            *keypair.public_point()
        );
    }
}
