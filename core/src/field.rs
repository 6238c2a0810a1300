//! KoalaBear field arithmetic in Montgomery form.
//!
//! KoalaBear is a 31-bit prime field with p = 2^31 - 2^24 + 1 = 2130706433.
//! Elements are stored as Montgomery residues with R = 2^32, so multiplication
//! is a single widening multiply followed by a Montgomery reduction.

use core::fmt;
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// KoalaBear prime: p = 2^31 - 2^24 + 1 = 2130706433
pub const P: u32 = 0x7F00_0001;

/// P^-1 mod 2^32, used by the Montgomery reduction.
const MONTY_MU: u32 = 0x8100_0001;

/// Convert a canonical residue (must be < P) into Montgomery form.
const fn to_monty(value: u32) -> u32 {
    (((value as u64) << 32) % (P as u64)) as u32
}

/// Montgomery reduction of x < P * 2^32: returns (x / 2^32) mod P.
///
/// Branch-free up to the final conditional correction.
const fn monty_reduce(x: u64) -> u32 {
    let t = (x as u32).wrapping_mul(MONTY_MU) as u64;
    let u = t * (P as u64);
    let (x_sub_u, over) = x.overflowing_sub(u);
    let result = (x_sub_u >> 32) as u32;
    let corr = if over { P } else { 0 };
    result.wrapping_add(corr)
}

/// KoalaBear field element, stored as a Montgomery residue in [0, P).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KoalaBear {
    value: u32,
}

impl KoalaBear {
    /// Additive identity.
    pub const ZERO: Self = Self { value: 0 };

    /// Multiplicative identity.
    pub const ONE: Self = Self { value: to_monty(1) };

    /// Build a field element from an arbitrary u32, reducing mod P.
    #[inline]
    pub const fn from_u32(value: u32) -> Self {
        Self {
            value: to_monty(value % P),
        }
    }

    /// Canonical (non-Montgomery) residue in [0, P).
    #[inline]
    pub const fn to_u32(self) -> u32 {
        monty_reduce(self.value as u64)
    }

    /// Raw Montgomery residue. Only meaningful to code that understands the
    /// internal representation.
    #[inline]
    pub const fn to_monty_u32(self) -> u32 {
        self.value
    }

    #[inline]
    pub fn square(self) -> Self {
        self * self
    }

    #[inline]
    pub fn double(self) -> Self {
        self + self
    }

    /// Exact division by two.
    #[inline]
    pub const fn halve(self) -> Self {
        let v = self.value;
        let value = if v & 1 == 0 { v >> 1 } else { (v + P) >> 1 };
        Self { value }
    }

    /// Exact division by 2^exp, as repeated halving.
    #[inline]
    pub const fn div_2exp(self, exp: u32) -> Self {
        let mut out = self;
        let mut k = 0;
        while k < exp {
            out = out.halve();
            k += 1;
        }
        out
    }

    /// self^exp by square-and-multiply.
    pub fn pow(self, mut exp: u32) -> Self {
        let mut result = Self::ONE;
        let mut base = self;
        while exp > 0 {
            if exp & 1 == 1 {
                result *= base;
            }
            base = base.square();
            exp >>= 1;
        }
        result
    }

    /// Multiplicative inverse via Fermat: a^(p-2). Inverse of zero is zero.
    pub fn inverse(self) -> Self {
        self.pow(P - 2)
    }
}

impl Add for KoalaBear {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        let mut sum = self.value + rhs.value;
        if sum >= P {
            sum -= P;
        }
        Self { value: sum }
    }
}

impl AddAssign for KoalaBear {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for KoalaBear {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        let value = if self.value >= rhs.value {
            self.value - rhs.value
        } else {
            self.value + P - rhs.value
        };
        Self { value }
    }
}

impl SubAssign for KoalaBear {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for KoalaBear {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            value: monty_reduce(self.value as u64 * rhs.value as u64),
        }
    }
}

impl MulAssign for KoalaBear {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Neg for KoalaBear {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        let value = if self.value == 0 { 0 } else { P - self.value };
        Self { value }
    }
}

impl fmt::Debug for KoalaBear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u32())
    }
}

// The wire form of a field element is its canonical residue as a u32.
impl Serialize for KoalaBear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_u32())
    }
}

impl<'de> Deserialize<'de> for KoalaBear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Ok(Self::from_u32(value))
    }
}

/// Fixed-size array of field elements: hashes, parameters, randomness.
///
/// Serializes as a tuple of canonical u32 values so fixed-length data carries
/// no length prefix on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FieldArray<const N: usize>(pub [KoalaBear; N]);

impl<const N: usize> FieldArray<N> {
    pub const fn new(arr: [KoalaBear; N]) -> Self {
        Self(arr)
    }

    pub const fn inner(&self) -> &[KoalaBear; N] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &KoalaBear> {
        self.0.iter()
    }

    /// First M elements, M <= N.
    pub fn truncated<const M: usize>(&self) -> FieldArray<M> {
        let mut out = [KoalaBear::ZERO; M];
        out.copy_from_slice(&self.0[..M]);
        FieldArray(out)
    }
}

impl<const N: usize> Default for FieldArray<N> {
    fn default() -> Self {
        Self([KoalaBear::ZERO; N])
    }
}

impl<const N: usize> AsRef<[KoalaBear]> for FieldArray<N> {
    fn as_ref(&self) -> &[KoalaBear] {
        &self.0
    }
}

impl<const N: usize> From<[KoalaBear; N]> for FieldArray<N> {
    fn from(arr: [KoalaBear; N]) -> Self {
        Self(arr)
    }
}

impl<const N: usize> fmt::Debug for FieldArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<const N: usize> Serialize for FieldArray<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(N)?;
        for elem in &self.0 {
            tuple.serialize_element(elem)?;
        }
        tuple.end()
    }
}

impl<'de, const N: usize> Deserialize<'de> for FieldArray<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArrayVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for ArrayVisitor<N> {
            type Value = FieldArray<N>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an array of {} field elements", N)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut arr = [KoalaBear::ZERO; N];
                for (i, slot) in arr.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                Ok(FieldArray(arr))
            }
        }

        deserializer.deserialize_tuple(N, ArrayVisitor::<N>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn montgomery_round_trip() {
        for x in [0u32, 1, 2, P - 1, P, P + 1, 0x1234_5678, u32::MAX] {
            assert_eq!(KoalaBear::from_u32(x).to_u32(), x % P);
        }
    }

    #[test]
    fn addition_known_answer() {
        let a = KoalaBear::from_u32(1862878127);
        let b = KoalaBear::from_u32(169548476);
        assert_eq!((a + b).to_u32(), 2032426603);
    }

    #[test]
    fn addition_wraps_at_modulus() {
        let a = KoalaBear::from_u32(P - 1);
        let b = KoalaBear::from_u32(2);
        assert_eq!((a + b).to_u32(), 1);
    }

    #[test]
    fn subtraction_and_negation() {
        let a = KoalaBear::from_u32(100);
        let b = KoalaBear::from_u32(200);
        assert_eq!((b - a).to_u32(), 100);
        assert_eq!((a - b).to_u32(), P - 100);
        assert_eq!((-a).to_u32(), P - 100);
        assert_eq!((-KoalaBear::ZERO).to_u32(), 0);
    }

    #[test]
    fn multiplication_small_values() {
        let a = KoalaBear::from_u32(100);
        let b = KoalaBear::from_u32(200);
        assert_eq!((a * b).to_u32(), 20000);
        assert_eq!((a * KoalaBear::ONE).to_u32(), 100);
        assert_eq!((a * KoalaBear::ZERO).to_u32(), 0);
    }

    #[test]
    fn halve_is_exact_division_by_two() {
        for x in [1u32, 2, 3, 1_000_000, P - 1] {
            let a = KoalaBear::from_u32(x);
            assert_eq!(a.halve().double(), a);
        }
    }

    #[test]
    fn div_2exp_matches_repeated_halving() {
        let a = KoalaBear::from_u32(0x0BAD_F00D);
        let mut expected = a;
        for k in 0..8 {
            assert_eq!(a.div_2exp(k), expected);
            expected = expected.halve();
        }
    }

    #[test]
    fn inverse_of_nonzero_elements() {
        for x in [1u32, 2, 12345, P - 2, P - 1] {
            let a = KoalaBear::from_u32(x);
            assert_eq!(a * a.inverse(), KoalaBear::ONE);
        }
    }

    #[test]
    fn field_array_truncation() {
        let arr = FieldArray::<4>::new([
            KoalaBear::from_u32(1),
            KoalaBear::from_u32(2),
            KoalaBear::from_u32(3),
            KoalaBear::from_u32(4),
        ]);
        let short: FieldArray<2> = arr.truncated();
        assert_eq!(short.inner()[0].to_u32(), 1);
        assert_eq!(short.inner()[1].to_u32(), 2);
    }
}
