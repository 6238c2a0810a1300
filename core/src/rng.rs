//! Seeded deterministic randomness.
//!
//! Every random value the scheme consumes (public parameter, PRF key, Merkle
//! padding nodes) is drawn from a ChaCha12 stream seeded with 32 bytes.
//! The draw order is part of the wire contract: two implementations produce
//! the same keys iff they consume the stream identically.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;

use gxmss_constants::PRF_KEY_LENGTH;

use crate::error::XmssError;
use crate::field::{FieldArray, KoalaBear, P};

/// Seed length in bytes.
pub const SEED_LENGTH: usize = 32;

/// Deterministic ChaCha12-backed randomness source.
///
/// Words are extracted little-endian in 64-byte blocks. Field elements sample
/// the high 31 bits of a word and redraw until the sample lands below p.
#[derive(Debug)]
pub struct SeedRng {
    inner: ChaCha12Rng,
}

impl SeedRng {
    pub fn from_seed(seed: [u8; SEED_LENGTH]) -> Self {
        Self {
            inner: ChaCha12Rng::from_seed(seed),
        }
    }

    /// Build from a byte slice, rejecting anything that is not 32 bytes.
    pub fn from_seed_slice(seed: &[u8]) -> Result<Self, XmssError> {
        let seed: [u8; SEED_LENGTH] =
            seed.try_into()
                .map_err(|_| XmssError::InvalidSeedLength {
                    expected: SEED_LENGTH,
                    actual: seed.len(),
                })?;
        Ok(Self::from_seed(seed))
    }

    /// Fill a buffer with the next bytes of the stream.
    pub fn fill(&mut self, buf: &mut [u8]) {
        self.inner.fill_bytes(buf);
    }

    /// Next four bytes of the stream as a little-endian u32.
    pub fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Draw one field element: the next word shifted down to 31 bits,
    /// redrawn while the sample is not below p.
    pub fn random_field_element(&mut self) -> KoalaBear {
        loop {
            let sample = self.next_u32() >> 1;
            if sample < P {
                return KoalaBear::from_u32(sample);
            }
        }
    }

    /// Draw N field elements, one word per accepted sample.
    pub fn random_field_array<const N: usize>(&mut self) -> FieldArray<N> {
        let mut arr = [KoalaBear::ZERO; N];
        for slot in arr.iter_mut() {
            *slot = self.random_field_element();
        }
        FieldArray::new(arr)
    }

    /// Draw a fresh PRF key.
    pub fn random_prf_key(&mut self) -> [u8; PRF_KEY_LENGTH] {
        let mut key = [0u8; PRF_KEY_LENGTH];
        self.fill(&mut key);
        key
    }
}
