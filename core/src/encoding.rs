//! Incomparable target-sum encoding of message digests.
//!
//! The top-level Poseidon hash turns (parameter, epoch, rho, message) into a
//! digest of MSG_LEN_FE field elements. The digest is then unranked into the
//! top layers of the hypercube [0, B-1]^D: vertices whose distance from the
//! all-(B-1) vertex is at most FINAL_LAYER. A signing attempt is accepted only
//! when the vertex lies exactly on the target-sum layer, so every accepted
//! codeword has digit sum TARGET_SUM. Distinct accepted codewords share that
//! sum and are therefore incomparable coordinate-wise, which is what stops
//! chain-reuse forgeries.

use core::cmp::Ordering;

use gxmss_constants::{
    MESSAGE_LENGTH, PARAMETER_LEN, TWEAK_LEN, TWEAK_SEPARATOR_FOR_MESSAGE_HASH,
};

use crate::field::{FieldArray, KoalaBear, P};
use crate::poseidon::{poseidon_compress, WIDTH_24};
use crate::tweak_hash::Parameter;

type F = KoalaBear;

/// Tweak prefix for the top-level message hash: (epoch << 8) | separator,
/// decomposed base-p.
pub fn message_epoch_tweak(epoch: u32) -> [F; TWEAK_LEN] {
    let mut acc: u128 = ((epoch as u128) << 8) | (TWEAK_SEPARATOR_FOR_MESSAGE_HASH as u128);
    let mut out = [F::ZERO; TWEAK_LEN];
    for digit in out.iter_mut() {
        *digit = F::from_u32((acc % (P as u128)) as u32);
        acc /= P as u128;
    }
    out
}

/// Decompose the 32-byte message into M field elements, one 16-byte half at a
/// time interpreted as a big-endian integer written base-p.
pub fn message_to_field_elements<const M: usize>(message: &[u8; MESSAGE_LENGTH]) -> [F; M] {
    let p = P as u128;
    let half = M / 2 + 1;

    let mut acc: u128 = 0;
    for &byte in message.iter().take(MESSAGE_LENGTH / 2) {
        acc = (acc << 8) | (byte as u128);
    }

    let mut out = [F::ZERO; M];
    for digit in out.iter_mut().take(half) {
        *digit = F::from_u32((acc % p) as u32);
        acc /= p;
    }

    acc = 0;
    for &byte in message.iter().skip(MESSAGE_LENGTH / 2) {
        acc = (acc << 8) | (byte as u128);
    }
    for digit in out.iter_mut().skip(half) {
        *digit = F::from_u32((acc % p) as u32);
        acc /= p;
    }

    out
}

/// Top-level Poseidon message hash: compress
/// `rho || parameter || epoch_tweak || message_fe` at width 24 down to M
/// digest elements.
pub fn message_hash<const M: usize, const R: usize>(
    parameter: &Parameter,
    epoch: u32,
    rho: &FieldArray<R>,
    message: &[u8; MESSAGE_LENGTH],
) -> [F; M] {
    let tweak = message_epoch_tweak(epoch);
    let message_fe = message_to_field_elements::<M>(message);

    let mut input: Vec<F> = Vec::with_capacity(R + PARAMETER_LEN + TWEAK_LEN + M);
    input.extend_from_slice(rho.inner());
    input.extend_from_slice(parameter.inner());
    input.extend_from_slice(&tweak);
    input.extend_from_slice(&message_fe);

    poseidon_compress::<{ WIDTH_24 }, M>(&input)
}

/// Check the two rejection conditions on a codeword.
pub fn is_valid_codeword(digits: &[u8], base: usize, target_sum: usize, final_layer: usize) -> bool {
    let sum: usize = digits.iter().map(|&d| d as usize).sum();
    let distance: usize = digits.iter().map(|&d| base - 1 - d as usize).sum();
    sum == target_sum && distance <= final_layer
}

/// Unsigned big integer on u64 limbs, little-endian, normalized.
///
/// Just enough arithmetic for digest unranking: the layer-size table only
/// needs additions, the digest reduction a shift-and-subtract remainder.
#[derive(Clone, Debug, PartialEq, Eq)]
struct BigNat {
    limbs: Vec<u64>,
}

impl BigNat {
    fn zero() -> Self {
        Self { limbs: Vec::new() }
    }

    fn from_u64(value: u64) -> Self {
        let mut out = Self { limbs: vec![value] };
        out.normalize();
        out
    }

    fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    fn normalize(&mut self) {
        while self.limbs.last() == Some(&0) {
            self.limbs.pop();
        }
    }

    fn bit_len(&self) -> usize {
        match self.limbs.last() {
            None => 0,
            Some(&top) => 64 * (self.limbs.len() - 1) + (64 - top.leading_zeros() as usize),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        if self.limbs.len() != other.limbs.len() {
            return self.limbs.len().cmp(&other.limbs.len());
        }
        for (a, b) in self.limbs.iter().rev().zip(other.limbs.iter().rev()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }

    fn add_assign(&mut self, other: &Self) {
        if self.limbs.len() < other.limbs.len() {
            self.limbs.resize(other.limbs.len(), 0);
        }
        let mut carry: u128 = 0;
        for (i, limb) in self.limbs.iter_mut().enumerate() {
            let rhs = other.limbs.get(i).copied().unwrap_or(0);
            let acc = *limb as u128 + rhs as u128 + carry;
            *limb = acc as u64;
            carry = acc >> 64;
        }
        if carry > 0 {
            self.limbs.push(carry as u64);
        }
    }

    /// Subtract `other` from `self`; requires self >= other.
    fn sub_assign(&mut self, other: &Self) {
        debug_assert!(self.compare(other) != Ordering::Less);
        let mut borrow: i128 = 0;
        for (i, limb) in self.limbs.iter_mut().enumerate() {
            let rhs = other.limbs.get(i).copied().unwrap_or(0);
            let acc = *limb as i128 - rhs as i128 - borrow;
            if acc < 0 {
                *limb = (acc + (1i128 << 64)) as u64;
                borrow = 1;
            } else {
                *limb = acc as u64;
                borrow = 0;
            }
        }
        self.normalize();
    }

    /// self = self * mul + add.
    fn mul_small_add(&mut self, mul: u64, add: u64) {
        let mut carry = add as u128;
        for limb in self.limbs.iter_mut() {
            let acc = *limb as u128 * mul as u128 + carry;
            *limb = acc as u64;
            carry = acc >> 64;
        }
        while carry > 0 {
            self.limbs.push(carry as u64);
            carry >>= 64;
        }
        self.normalize();
    }

    fn shl_bits(&self, shift: usize) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        let limb_shift = shift / 64;
        let bit_shift = shift % 64;
        let mut limbs = vec![0u64; limb_shift];
        if bit_shift == 0 {
            limbs.extend_from_slice(&self.limbs);
        } else {
            let mut carry = 0u64;
            for &limb in &self.limbs {
                limbs.push((limb << bit_shift) | carry);
                carry = limb >> (64 - bit_shift);
            }
            if carry > 0 {
                limbs.push(carry);
            }
        }
        let mut out = Self { limbs };
        out.normalize();
        out
    }

    /// self mod m, by shift-and-subtract.
    fn rem_assign(&mut self, m: &Self) {
        debug_assert!(!m.is_zero());
        if self.compare(m) == Ordering::Less {
            return;
        }
        let shift = self.bit_len() - m.bit_len();
        for k in (0..=shift).rev() {
            let t = m.shl_bits(k);
            if self.compare(&t) != Ordering::Less {
                self.sub_assign(&t);
            }
        }
    }
}

/// Maps digests into the top FINAL_LAYER + 1 layers of [0, base-1]^dimension.
///
/// Layer d holds the vertices at distance d from the all-(base-1) vertex.
/// The mapper carries the bounded-composition counts needed to unrank an
/// integer into a concrete vertex.
pub struct VertexMapper {
    dimension: usize,
    base: usize,
    final_layer: usize,
    /// counts[n][s]: vectors of length n with entries in [0, base-1] and
    /// entry sum s.
    counts: Vec<Vec<BigNat>>,
    /// Total number of vertices across layers 0..=final_layer.
    total: BigNat,
}

impl VertexMapper {
    pub fn new(dimension: usize, base: usize, final_layer: usize) -> Self {
        let mut counts: Vec<Vec<BigNat>> = Vec::with_capacity(dimension + 1);
        let mut row0 = vec![BigNat::zero(); final_layer + 1];
        row0[0] = BigNat::from_u64(1);
        counts.push(row0);

        for n in 1..=dimension {
            let mut row = vec![BigNat::zero(); final_layer + 1];
            for s in 0..=final_layer {
                let mut acc = BigNat::zero();
                for y in 0..base.min(s + 1) {
                    acc.add_assign(&counts[n - 1][s - y]);
                }
                row[s] = acc;
            }
            counts.push(row);
        }

        let mut total = BigNat::zero();
        for s in 0..=final_layer {
            total.add_assign(&counts[dimension][s]);
        }

        Self {
            dimension,
            base,
            final_layer,
            counts,
            total,
        }
    }

    /// Unrank a digest into a codeword of `dimension` base-`base` digits.
    pub fn map_digest(&self, digest: &[F]) -> Vec<u8> {
        // Digest elements are base-p digits, least significant first.
        let mut index = BigNat::zero();
        for fe in digest.iter().rev() {
            index.mul_small_add(P as u64, fe.to_u32() as u64);
        }
        index.rem_assign(&self.total);

        // Find the layer: walk distances upward, consuming layer sizes.
        let mut layer = 0;
        while self.counts[self.dimension][layer].compare(&index) != Ordering::Greater {
            index.sub_assign(&self.counts[self.dimension][layer]);
            layer += 1;
            debug_assert!(layer <= self.final_layer);
        }

        // Unrank within the layer, one coordinate at a time.
        let mut digits = Vec::with_capacity(self.dimension);
        let mut remaining = layer;
        for i in 0..self.dimension {
            let rest = self.dimension - 1 - i;
            for y in 0..self.base.min(remaining + 1) {
                let count = &self.counts[rest][remaining - y];
                if count.compare(&index) == Ordering::Greater {
                    digits.push((self.base - 1 - y) as u8);
                    remaining -= y;
                    break;
                }
                index.sub_assign(count);
            }
        }
        debug_assert_eq!(digits.len(), self.dimension);
        debug_assert_eq!(remaining, 0);

        digits
    }
}
