//! Generalized XMSS signatures over KoalaBear with Poseidon2 hashing.
//!
//! A stateful hash-based signature scheme: Winternitz one-time signatures
//! with an incomparable target-sum encoding, aggregated under a two-level
//! Merkle tree so one public key covers up to 2^L epochs. All hashing is a
//! tweakable hash built on the Poseidon2 permutation over the KoalaBear
//! field (p = 2^31 - 2^24 + 1), and all key material is derived
//! deterministically from a 32-byte seed through a ChaCha12 stream.
//!
//! Supported lifetimes (see `gxmss-constants`):
//! - 2^8 epochs, hash output 8 field elements
//! - 2^18 epochs, hash output 7 field elements
//! - 2^32 epochs, hash output 8 field elements

pub mod encoding;
pub mod error;
pub mod field;
pub mod merkle;
pub mod poseidon;
pub mod prf;
pub mod rng;
pub mod serialization;
pub mod signature;
pub mod tweak_hash;
pub mod types;

pub use error::XmssError;
pub use field::{FieldArray, KoalaBear};
pub use serialization::Serializable;
pub use signature::GeneralizedXmss;
pub use tweak_hash::Parameter;
pub use types::{PublicKey, SecretKey, Signature};

/// Field type used throughout (KoalaBear).
pub type F = KoalaBear;

use gxmss_constants::lifetime_2_to_the_18 as l18;
use gxmss_constants::lifetime_2_to_the_32 as l32;
use gxmss_constants::lifetime_2_to_the_8 as l8;

/// Scheme instantiation for keys with 2^8 epochs.
pub type XmssLifetime8 = GeneralizedXmss<
    { l8::LOG_LIFETIME },
    { l8::DIMENSION },
    { l8::CHAIN_BASE },
    { l8::FINAL_LAYER },
    { l8::TARGET_SUM },
    { l8::MSG_LEN_FE },
    { l8::RAND_LEN_FE },
    { l8::HASH_LEN_FE },
>;

/// Scheme instantiation for keys with 2^18 epochs.
pub type XmssLifetime18 = GeneralizedXmss<
    { l18::LOG_LIFETIME },
    { l18::DIMENSION },
    { l18::CHAIN_BASE },
    { l18::FINAL_LAYER },
    { l18::TARGET_SUM },
    { l18::MSG_LEN_FE },
    { l18::RAND_LEN_FE },
    { l18::HASH_LEN_FE },
>;

/// Scheme instantiation for keys with 2^32 epochs.
pub type XmssLifetime32 = GeneralizedXmss<
    { l32::LOG_LIFETIME },
    { l32::DIMENSION },
    { l32::CHAIN_BASE },
    { l32::FINAL_LAYER },
    { l32::TARGET_SUM },
    { l32::MSG_LEN_FE },
    { l32::RAND_LEN_FE },
    { l32::HASH_LEN_FE },
>;

/// Default instantiation used by the tooling around this crate.
pub type DefaultSignatureScheme = XmssLifetime8;

/// Hash arbitrary-length message bytes down to the 32-byte input the scheme
/// signs.
pub fn hash_message_to_digest(message: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.finalize().into()
}
