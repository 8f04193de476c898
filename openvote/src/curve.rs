use crate::*;

use num_bigint::{BigInt, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::Rng;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Parameters of a short-Weierstrass prime-field curve.
///
/// Created once per session by the coordinator and shared read-only with
/// every voter. All fields travel as decimal-digit strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DomainParameters {
    /// Field prime
    #[serde(with = "crate::serde_bigint")]
    pub p: BigInt,

    /// Curve coefficient a
    #[serde(with = "crate::serde_bigint")]
    pub a: BigInt,

    /// Curve coefficient b
    #[serde(with = "crate::serde_bigint")]
    pub b: BigInt,

    /// Generator x coordinate
    #[serde(with = "crate::serde_bigint")]
    pub gx: BigInt,

    /// Generator y coordinate
    #[serde(with = "crate::serde_bigint")]
    pub gy: BigInt,

    /// Order of the generator
    #[serde(with = "crate::serde_bigint")]
    pub n: BigInt,

    /// Cofactor
    #[serde(with = "crate::serde_bigint")]
    pub h: BigInt,
}

impl DomainParameters {
    /// The NIST P-256 (prime256v1) parameters, the curve the coordinator
    /// distributes at the start of every session.
    pub fn prime256v1() -> Self {
        DomainParameters {
            p: from_hex("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff"),
            a: from_hex("ffffffff00000001000000000000000000000000fffffffffffffffffffffffc"),
            b: from_hex("5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b"),
            gx: from_hex("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296"),
            gy: from_hex("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5"),
            n: from_hex("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551"),
            h: BigInt::one(),
        }
    }
}

fn from_hex(digits: &str) -> BigInt {
    BigInt::parse_bytes(digits.as_bytes(), 16).expect("hardcoded curve constant")
}

/// A point on the curve: affine coordinates or the point at infinity.
///
/// Value type, copied freely. Equality is affine-coordinate equality;
/// coordinates are always kept reduced mod p so no normalization pass is
/// needed before comparing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Point {
    Infinity,
    Affine { x: BigInt, y: BigInt },
}

impl Point {
    pub fn affine(x: BigInt, y: BigInt) -> Self {
        Point::Affine { x, y }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Point::Infinity => write!(f, "(infinity)"),
            Point::Affine { x, y } => write!(f, "({},{})", x, y),
        }
    }
}

// The wire form is `{"x": "...", "y": "..."}` with decimal-digit strings,
// or `null` for infinity. Infinity is never legal inside a payload; the
// curve-membership check rejects it wherever a finite point is required.
impl Serialize for Point {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Point::Infinity => serializer.serialize_none(),
            Point::Affine { x, y } => {
                let mut state = serializer.serialize_struct("Point", 2)?;
                state.serialize_field("x", &x.to_str_radix(10))?;
                state.serialize_field("y", &y.to_str_radix(10))?;
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        #[derive(Deserialize)]
        struct AffineRepr {
            x: String,
            y: String,
        }

        let repr = Option::<AffineRepr>::deserialize(deserializer)?;
        match repr {
            None => Ok(Point::Infinity),
            Some(repr) => {
                let x = repr
                    .x
                    .parse::<BigInt>()
                    .map_err(|e| D::Error::custom(format!("invalid x coordinate: {}", e)))?;
                let y = repr
                    .y
                    .parse::<BigInt>()
                    .map_err(|e| D::Error::custom(format!("invalid y coordinate: {}", e)))?;
                Ok(Point::Affine { x, y })
            }
        }
    }
}

/// Affine arithmetic on one prime-field curve.
///
/// Every party builds its own context from the broadcast
/// [`DomainParameters`]; all cross-party data is plain [`Point`]s.
#[derive(Debug, Clone)]
pub struct CurveContext {
    params: DomainParameters,
}

impl CurveContext {
    /// Build a context, rejecting parameters whose generator does not
    /// satisfy the curve equation.
    pub fn new(params: DomainParameters) -> Result<Self, ValidationError> {
        if params.p.sign() != num_bigint::Sign::Plus || params.n.sign() != num_bigint::Sign::Plus {
            return Err(ValidationError::InvalidParameters);
        }
        let ctx = CurveContext { params };
        if !ctx.is_on_curve(&ctx.generator()) {
            return Err(ValidationError::InvalidParameters);
        }
        Ok(ctx)
    }

    pub fn params(&self) -> &DomainParameters {
        &self.params
    }

    /// The group order n.
    pub fn order(&self) -> &BigInt {
        &self.params.n
    }

    pub fn generator(&self) -> Point {
        Point::Affine {
            x: self.params.gx.clone(),
            y: self.params.gy.clone(),
        }
    }

    /// Point addition, including all identity and inverse cases.
    pub fn add(&self, p: &Point, q: &Point) -> Point {
        let modulus = &self.params.p;
        let (x1, y1, x2, y2) = match (p, q) {
            (Point::Infinity, _) => return q.clone(),
            (_, Point::Infinity) => return p.clone(),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };

        let lambda = if x1 == x2 {
            // P + (-P) = infinity, which also covers the y = 0 tangent
            if (y1 + y2).mod_floor(modulus).is_zero() {
                return Point::Infinity;
            }
            // point doubling: lambda = (3*x1^2 + a) / (2*y1)
            let numerator = (BigInt::from(3u8) * x1 * x1 + &self.params.a).mod_floor(modulus);
            let denominator = (BigInt::from(2u8) * y1).mod_floor(modulus);
            (numerator * self.invert_mod_p(&denominator)).mod_floor(modulus)
        } else {
            // chord: lambda = (y2 - y1) / (x2 - x1)
            let numerator = (y2 - y1).mod_floor(modulus);
            let denominator = (x2 - x1).mod_floor(modulus);
            (numerator * self.invert_mod_p(&denominator)).mod_floor(modulus)
        };

        let x3 = (&lambda * &lambda - x1 - x2).mod_floor(modulus);
        let y3 = (lambda * (x1 - &x3) - y1).mod_floor(modulus);
        Point::Affine { x: x3, y: y3 }
    }

    pub fn negate(&self, p: &Point) -> Point {
        match p {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: (-y).mod_floor(&self.params.p),
            },
        }
    }

    /// Scalar multiplication by double-and-add. Negative scalars
    /// multiply the negated point; the scalar is reduced mod n.
    pub fn scalar_mul(&self, k: &BigInt, p: &Point) -> Point {
        if k.is_negative() {
            return self.scalar_mul(&-k, &self.negate(p));
        }

        let mut k = k.mod_floor(&self.params.n);
        let mut addend = p.clone();
        let mut acc = Point::Infinity;
        while !k.is_zero() {
            if k.is_odd() {
                acc = self.add(&acc, &addend);
            }
            addend = self.add(&addend, &addend);
            k = k >> 1u32;
        }
        acc
    }

    /// Whether the point satisfies `y^2 = x^3 + a*x + b (mod p)` with
    /// canonical coordinates. Infinity is a group member.
    pub fn is_on_curve(&self, point: &Point) -> bool {
        let modulus = &self.params.p;
        match point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                if x.is_negative() || y.is_negative() || x >= modulus || y >= modulus {
                    return false;
                }
                let lhs = (y * y).mod_floor(modulus);
                let rhs = (x * x * x + &self.params.a * x + &self.params.b).mod_floor(modulus);
                lhs == rhs
            }
        }
    }

    /// Validate a peer-supplied point: it must be a finite curve point.
    pub fn check_point(&self, point: &Point) -> Result<(), ValidationError> {
        if point.is_infinity() || !self.is_on_curve(point) {
            return Err(ValidationError::InvalidPoint);
        }
        Ok(())
    }

    /// Reduce a scalar into `[0, n)`.
    pub fn reduce_scalar(&self, k: &BigInt) -> BigInt {
        k.mod_floor(&self.params.n)
    }

    /// Draw a random scalar in `[1, n-1)`. The bit length is itself
    /// randomized a little below the order's, so encodings stay short of
    /// the order without skewing any individual bit.
    pub fn random_scalar<R: Rng + ?Sized>(&self, rng: &mut R) -> BigInt {
        let order_bits = self.params.n.bits();
        let upper = &self.params.n - BigInt::one();
        loop {
            let dropped = rng.gen_range(0..=order_bits / 10);
            let candidate = BigInt::from(rng.gen_biguint(order_bits - dropped));
            if candidate >= BigInt::one() && candidate < upper {
                return candidate;
            }
        }
    }

    // Inversion by extended Euclid; p is prime and v is nonzero mod p on
    // every path that reaches this, so the gcd is always 1.
    fn invert_mod_p(&self, v: &BigInt) -> BigInt {
        let extended = v.extended_gcd(&self.params.p);
        extended.x.mod_floor(&self.params.p)
    }
}
