//! SHAKE-128 PRF mapping (key, epoch, index) to field-element vectors.
//!
//! Chain starting points and encoding randomness are both derived here, so
//! the secret key only ever stores the 32-byte PRF key.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake128;

use gxmss_constants::PRF_KEY_LENGTH;

use crate::field::{FieldArray, KoalaBear, P};

/// Derive one domain element of H field elements.
///
/// Absorbs `separator || key || epoch_be || index_be`; the separator is the
/// hashing profile identifier so distinct lifetimes use distinct streams.
/// Samples are little-endian u32 words, rejection-resampled until below p.
pub fn prf_domain_element<const H: usize>(
    separator: u8,
    key: &[u8; PRF_KEY_LENGTH],
    epoch: u32,
    index: u64,
) -> FieldArray<H> {
    let mut shake = Shake128::default();
    shake.update(&[separator]);
    shake.update(key);
    shake.update(&epoch.to_be_bytes());
    shake.update(&index.to_be_bytes());
    let mut reader = shake.finalize_xof();

    let mut out = [KoalaBear::ZERO; H];
    let mut buf = [0u8; 4];
    for slot in out.iter_mut() {
        loop {
            reader.read(&mut buf);
            let sample = u32::from_le_bytes(buf);
            if sample < P {
                *slot = KoalaBear::from_u32(sample);
                break;
            }
        }
    }
    FieldArray::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0xA5; 32];

    #[test]
    fn derivation_is_deterministic() {
        let a: FieldArray<8> = prf_domain_element(8, &KEY, 3, 17);
        let b: FieldArray<8> = prf_domain_element(8, &KEY, 3, 17);
        assert_eq!(a, b);
    }

    #[test]
    fn inputs_are_domain_separating() {
        let base: FieldArray<8> = prf_domain_element(8, &KEY, 3, 17);
        let other_epoch: FieldArray<8> = prf_domain_element(8, &KEY, 4, 17);
        let other_index: FieldArray<8> = prf_domain_element(8, &KEY, 3, 18);
        let other_profile: FieldArray<8> = prf_domain_element(18, &KEY, 3, 17);
        let other_key: FieldArray<8> = prf_domain_element(8, &[0xA6; 32], 3, 17);

        assert_ne!(base, other_epoch);
        assert_ne!(base, other_index);
        assert_ne!(base, other_profile);
        assert_ne!(base, other_key);
    }

    #[test]
    fn outputs_are_canonical_residues() {
        let out: FieldArray<7> = prf_domain_element(18, &KEY, 0, 0);
        for elem in out.iter() {
            assert!(elem.to_u32() < P);
        }
    }

    #[test]
    fn shorter_outputs_are_prefixes() {
        // Truncating the requested length must not change the leading
        // samples, since rho reuses a prefix of the chain-length stream.
        let long: FieldArray<8> = prf_domain_element(8, &KEY, 5, 42);
        let short: FieldArray<7> = prf_domain_element(8, &KEY, 5, 42);
        assert_eq!(&long.inner()[..7], &short.inner()[..]);
    }
}
