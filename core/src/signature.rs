//! The generalized XMSS signature scheme.
//!
//! One scheme instantiation fixes the key lifetime and the encoding geometry
//! through const parameters; the crate root exposes aliases for the supported
//! lifetimes. Keys cover an activation window of epochs, each epoch signs at
//! most once, and the secret key keeps two adjacent bottom trees materialized
//! as the prepared window.

use gxmss_constants::MESSAGE_LENGTH;

use crate::encoding::{is_valid_codeword, message_hash, VertexMapper};
use crate::error::XmssError;
use crate::field::{FieldArray, KoalaBear};
use crate::merkle::HashSubTree;
use crate::prf::prf_domain_element;
use crate::rng::SeedRng;
use crate::tweak_hash::{apply, chain, Parameter, Tweak};
use crate::types::{PublicKey, SecretKey, Signature};

/// Generalized XMSS over KoalaBear, parameterized by lifetime and encoding
/// geometry. See the lifetime modules in `gxmss-constants` for the supported
/// parameter sets.
pub struct GeneralizedXmss<
    const LOG_LIFETIME: usize,
    const DIMENSION: usize,
    const CHAIN_BASE: usize,
    const FINAL_LAYER: usize,
    const TARGET_SUM: usize,
    const MSG_LEN_FE: usize,
    const RAND_LEN_FE: usize,
    const HASH_LEN_FE: usize,
>;

impl<
        const LOG_LIFETIME: usize,
        const DIMENSION: usize,
        const CHAIN_BASE: usize,
        const FINAL_LAYER: usize,
        const TARGET_SUM: usize,
        const MSG_LEN_FE: usize,
        const RAND_LEN_FE: usize,
        const HASH_LEN_FE: usize,
    >
    GeneralizedXmss<
        LOG_LIFETIME,
        DIMENSION,
        CHAIN_BASE,
        FINAL_LAYER,
        TARGET_SUM,
        MSG_LEN_FE,
        RAND_LEN_FE,
        HASH_LEN_FE,
    >
{
    /// Total number of epochs a key can ever cover.
    pub const LIFETIME: u64 = 1 << LOG_LIFETIME;

    /// Height of one bottom tree; also the height of the top tree.
    pub const BOTTOM_TREE_HEIGHT: usize = LOG_LIFETIME / 2;

    /// Epochs covered by one bottom tree.
    pub const EPOCHS_PER_BOTTOM_TREE: u64 = 1 << (LOG_LIFETIME / 2);

    /// PRF domain separator: the hashing profile identifier.
    pub const PRF_SEPARATOR: u8 = LOG_LIFETIME as u8;

    /// Cap on rho re-derivations while searching for a valid codeword. The
    /// target-sum layer is hit after a few dozen attempts on average, so
    /// running out means something is deeply wrong.
    const MAX_ENCODING_ATTEMPTS: u64 = 100_000;

    /// Serialized SSZ signature size in bytes. Lifetime 2^8 uses a fixed
    /// interop container; other lifetimes use the natural packed size.
    pub const SIGNATURE_SSZ_LEN: usize = if LOG_LIFETIME == 8 {
        3116
    } else {
        (LOG_LIFETIME * HASH_LEN_FE + RAND_LEN_FE + DIMENSION * HASH_LEN_FE) * 4
    };

    /// Align the requested activation window to bottom-tree boundaries.
    ///
    /// Rounds the start down and the end up to multiples of the bottom-tree
    /// width, enforces a floor of two bottom trees, and shifts the window
    /// left when the floor pushes it past the lifetime. Returns the covered
    /// bottom-tree index range.
    pub fn expand_activation_time(
        activation_epoch: u64,
        num_active_epochs: u64,
    ) -> Result<(u64, u64), XmssError> {
        let lifetime = Self::LIFETIME;
        let invalid = XmssError::InvalidActivationParameters {
            activation_epoch,
            num_active_epochs,
            lifetime,
        };

        let requested_end = activation_epoch
            .checked_add(num_active_epochs)
            .ok_or_else(|| invalid.clone())?;
        if num_active_epochs == 0 || requested_end > lifetime {
            return Err(invalid);
        }

        let c = Self::EPOCHS_PER_BOTTOM_TREE;
        let mut start = activation_epoch & !(c - 1);
        let mut end = requested_end.div_ceil(c) * c;

        if end - start < 2 * c {
            end = start + 2 * c;
        }
        if end > lifetime {
            start -= end - lifetime;
            end = lifetime;
        }

        Ok((start / c, end / c))
    }

    /// Chain ends for every chain of one epoch, walked from the PRF starts.
    fn ots_chain_ends(
        prf_key: &[u8; 32],
        parameter: &Parameter,
        epoch: u32,
    ) -> Vec<FieldArray<HASH_LEN_FE>> {
        (0..DIMENSION)
            .map(|i| {
                let start: FieldArray<HASH_LEN_FE> =
                    prf_domain_element(Self::PRF_SEPARATOR, prf_key, epoch, i as u64);
                chain(parameter, epoch, i as u8, 0, CHAIN_BASE - 1, &start)
            })
            .collect()
    }

    /// OTS leaf: sponge-hash all chain ends of the epoch under the leaf tweak.
    fn ots_leaf(
        prf_key: &[u8; 32],
        parameter: &Parameter,
        epoch: u32,
    ) -> FieldArray<HASH_LEN_FE> {
        let ends = Self::ots_chain_ends(prf_key, parameter, epoch);
        apply(parameter, &Tweak::tree(0, epoch), &ends)
    }

    /// Bottom tree over one aligned run of epochs. Aligned full trees consume
    /// no padding draws, so rebuilding needs only the PRF key.
    fn build_bottom_tree(
        prf_key: &[u8; 32],
        parameter: &Parameter,
        tree_index: u64,
    ) -> HashSubTree<HASH_LEN_FE> {
        let c = Self::EPOCHS_PER_BOTTOM_TREE;
        let start_epoch = tree_index * c;
        let leaves = (0..c)
            .map(|j| Self::ots_leaf(prf_key, parameter, (start_epoch + j) as u32))
            .collect();
        HashSubTree::build_aligned(
            parameter,
            0,
            Self::BOTTOM_TREE_HEIGHT,
            start_epoch,
            leaves,
        )
    }

    /// Generate a keypair from a 32-byte seed.
    ///
    /// The RNG draw order is fixed: the parameter and the PRF key from the
    /// head of the seed stream, then any top-tree padding draws during
    /// construction. Key generation streams over the bottom trees: only the
    /// roots, the two prepared trees, and the top tree stay resident.
    pub fn key_gen(
        seed: &[u8],
        activation_epoch: u32,
        num_active_epochs: u32,
    ) -> Result<(PublicKey<HASH_LEN_FE>, SecretKey<HASH_LEN_FE>), XmssError> {
        let mut rng = SeedRng::from_seed_slice(seed)?;
        // The parameter and the PRF key are both carved from the head of the
        // seed stream: the parameter samples the leading words, the key takes
        // the leading bytes. Padding draws continue where the key ends.
        let parameter: Parameter = SeedRng::from_seed_slice(seed)?.random_field_array();
        let prf_key = rng.random_prf_key();

        let (bt_start, bt_end) =
            Self::expand_activation_time(activation_epoch as u64, num_active_epochs as u64)?;
        if bt_end - bt_start < 2 {
            return Err(XmssError::InsufficientBottomTrees {
                available: bt_end - bt_start,
            });
        }

        let mut roots = Vec::with_capacity((bt_end - bt_start) as usize);
        let mut left_bottom_tree = None;
        let mut right_bottom_tree = None;
        for tree_index in bt_start..bt_end {
            let tree = Self::build_bottom_tree(&prf_key, &parameter, tree_index);
            roots.push(*tree.root());
            if tree_index == bt_start {
                left_bottom_tree = Some(tree);
            } else if tree_index == bt_start + 1 {
                right_bottom_tree = Some(tree);
            }
        }

        let top_tree = HashSubTree::build(
            &mut rng,
            &parameter,
            Self::BOTTOM_TREE_HEIGHT,
            LOG_LIFETIME,
            bt_start,
            roots,
        );

        let (left_bottom_tree, right_bottom_tree) =
            match (left_bottom_tree, right_bottom_tree) {
                (Some(left), Some(right)) => (left, right),
                _ => {
                    return Err(XmssError::InsufficientBottomTrees {
                        available: bt_end - bt_start,
                    })
                }
            };

        let public_key = PublicKey {
            root: *top_tree.root(),
            parameter,
        };
        let secret_key = SecretKey {
            prf_key,
            parameter,
            activation_epoch: activation_epoch as u64,
            num_active_epochs: num_active_epochs as u64,
            top_tree,
            left_bottom_tree_index: bt_start,
            left_bottom_tree,
            right_bottom_tree,
        };
        Ok((public_key, secret_key))
    }

    /// Epoch range currently covered by the cached bottom trees.
    pub fn prepared_window(sk: &SecretKey<HASH_LEN_FE>) -> (u64, u64) {
        let c = Self::EPOCHS_PER_BOTTOM_TREE;
        let start = sk.left_bottom_tree_index * c;
        (start, start + 2 * c)
    }

    /// Sign a 32-byte message at the given epoch.
    ///
    /// Fails with `KeyNotActive` outside the activation window and
    /// `EpochNotPrepared` outside the cached bottom trees. Does not mutate
    /// the secret key; the caller advances the prepared window explicitly.
    pub fn sign(
        sk: &SecretKey<HASH_LEN_FE>,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
    ) -> Result<Signature<HASH_LEN_FE, RAND_LEN_FE>, XmssError> {
        let epoch_u64 = epoch as u64;
        let activation_end = sk.activation_epoch + sk.num_active_epochs;
        if epoch_u64 < sk.activation_epoch || epoch_u64 >= activation_end {
            return Err(XmssError::KeyNotActive {
                epoch,
                activation_epoch: sk.activation_epoch,
                num_active_epochs: sk.num_active_epochs,
            });
        }

        let (prepared_start, prepared_end) = Self::prepared_window(sk);
        if epoch_u64 < prepared_start || epoch_u64 >= prepared_end {
            return Err(XmssError::EpochNotPrepared {
                epoch,
                prepared_start,
                prepared_end,
            });
        }

        let (rho, digits) = Self::encode_with_retries(&sk.prf_key, &sk.parameter, epoch, message)?;

        let hashes: Vec<FieldArray<HASH_LEN_FE>> = digits
            .iter()
            .enumerate()
            .map(|(i, &digit)| {
                let start: FieldArray<HASH_LEN_FE> =
                    prf_domain_element(Self::PRF_SEPARATOR, &sk.prf_key, epoch, i as u64);
                chain(&sk.parameter, epoch, i as u8, 0, digit as usize, &start)
            })
            .collect();

        let bt_index = epoch_u64 >> Self::BOTTOM_TREE_HEIGHT;
        let bottom = if bt_index == sk.left_bottom_tree_index {
            &sk.left_bottom_tree
        } else {
            &sk.right_bottom_tree
        };
        let mut path = bottom.auth_path(epoch_u64);
        path.extend(sk.top_tree.auth_path(bt_index));

        Ok(Signature { path, rho, hashes })
    }

    /// Derive rho candidates from the PRF until the codeword lands on the
    /// target-sum layer.
    fn encode_with_retries(
        prf_key: &[u8; 32],
        parameter: &Parameter,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
    ) -> Result<(FieldArray<RAND_LEN_FE>, Vec<u8>), XmssError> {
        let mapper = VertexMapper::new(DIMENSION, CHAIN_BASE, FINAL_LAYER);
        for rho_nonce in 0..Self::MAX_ENCODING_ATTEMPTS {
            let full: FieldArray<HASH_LEN_FE> =
                prf_domain_element(Self::PRF_SEPARATOR, prf_key, epoch, rho_nonce);
            let rho: FieldArray<RAND_LEN_FE> = full.truncated();
            let digest: [KoalaBear; MSG_LEN_FE] = message_hash(parameter, epoch, &rho, message);
            let digits = mapper.map_digest(&digest);
            if is_valid_codeword(&digits, CHAIN_BASE, TARGET_SUM, FINAL_LAYER) {
                return Ok((rho, digits));
            }
        }
        Err(XmssError::EncodingFailure)
    }

    /// Verify a signature. Invalid signatures report `false` uniformly; the
    /// detailed variant below distinguishes the failure cause.
    pub fn verify(
        pk: &PublicKey<HASH_LEN_FE>,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
        sig: &Signature<HASH_LEN_FE, RAND_LEN_FE>,
    ) -> bool {
        Self::verify_detailed(pk, epoch, message, sig).is_ok()
    }

    /// Verification with typed failure causes, for debugging.
    pub fn verify_detailed(
        pk: &PublicKey<HASH_LEN_FE>,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
        sig: &Signature<HASH_LEN_FE, RAND_LEN_FE>,
    ) -> Result<(), XmssError> {
        if epoch as u64 >= Self::LIFETIME {
            return Err(XmssError::EpochTooLarge {
                epoch,
                lifetime: Self::LIFETIME,
            });
        }
        if sig.path.len() != LOG_LIFETIME || sig.hashes.len() != DIMENSION {
            return Err(XmssError::PathMismatch);
        }

        let digest: [KoalaBear; MSG_LEN_FE] =
            message_hash(&pk.parameter, epoch, &sig.rho, message);
        let mapper = VertexMapper::new(DIMENSION, CHAIN_BASE, FINAL_LAYER);
        let digits = mapper.map_digest(&digest);
        if !is_valid_codeword(&digits, CHAIN_BASE, TARGET_SUM, FINAL_LAYER) {
            return Err(XmssError::EncodingFailure);
        }

        let ends: Vec<FieldArray<HASH_LEN_FE>> = digits
            .iter()
            .zip(&sig.hashes)
            .enumerate()
            .map(|(i, (&digit, hash))| {
                chain(
                    &pk.parameter,
                    epoch,
                    i as u8,
                    digit,
                    CHAIN_BASE - 1 - digit as usize,
                    hash,
                )
            })
            .collect();

        let mut current = apply(&pk.parameter, &Tweak::tree(0, epoch), &ends);
        let mut idx = epoch as u64;
        for (level, sibling) in sig.path.iter().enumerate() {
            let children = if idx & 1 == 0 {
                [current, *sibling]
            } else {
                [*sibling, current]
            };
            idx >>= 1;
            current = apply(
                &pk.parameter,
                &Tweak::tree((level + 1) as u8, idx as u32),
                &children,
            );
        }

        if current == pk.root {
            Ok(())
        } else {
            Err(XmssError::PathMismatch)
        }
    }

    /// SSZ-encode a signature into this instantiation's container size.
    pub fn signature_to_ssz(sig: &Signature<HASH_LEN_FE, RAND_LEN_FE>) -> Vec<u8> {
        crate::serialization::ssz::signature_to_bytes(sig, Self::SIGNATURE_SSZ_LEN)
    }

    /// Decode an SSZ signature container.
    pub fn signature_from_ssz(
        bytes: &[u8],
    ) -> Result<Signature<HASH_LEN_FE, RAND_LEN_FE>, XmssError> {
        crate::serialization::ssz::signature_from_bytes(
            bytes,
            LOG_LIFETIME,
            DIMENSION,
            Self::SIGNATURE_SSZ_LEN,
        )
    }

    /// Slide the prepared window one bottom tree to the right: drop the left
    /// tree, move the right one over, and compute the next tree from the PRF
    /// key. A no-op once the window touches the end of the activation range.
    pub fn advance_preparation(sk: &mut SecretKey<HASH_LEN_FE>) -> Result<(), XmssError> {
        let (_, bt_end) =
            Self::expand_activation_time(sk.activation_epoch, sk.num_active_epochs)?;
        let next = sk.left_bottom_tree_index + 2;
        if next >= bt_end {
            return Ok(());
        }

        let new_right = Self::build_bottom_tree(&sk.prf_key, &sk.parameter, next);
        sk.left_bottom_tree = core::mem::replace(&mut sk.right_bottom_tree, new_right);
        sk.left_bottom_tree_index += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XmssLifetime8;

    const SEED: [u8; 32] = [0x42; 32];
    const MESSAGE: [u8; 32] = *b"hello world! hello world! hello!";

    #[test]
    fn expand_activation_time_aligns_and_enforces_floor() {
        // Full lifetime.
        assert_eq!(
            XmssLifetime8::expand_activation_time(0, 256).unwrap(),
            (0, 16)
        );
        // One epoch expands to two bottom trees.
        assert_eq!(XmssLifetime8::expand_activation_time(0, 1).unwrap(), (0, 2));
        // Rounding to tree boundaries.
        assert_eq!(
            XmssLifetime8::expand_activation_time(100, 10).unwrap(),
            (6, 8)
        );
        // Floor pushing past the lifetime shifts the window left.
        assert_eq!(
            XmssLifetime8::expand_activation_time(255, 1).unwrap(),
            (14, 16)
        );
    }

    #[test]
    fn expand_activation_time_rejects_bad_windows() {
        assert!(matches!(
            XmssLifetime8::expand_activation_time(250, 10),
            Err(XmssError::InvalidActivationParameters { .. })
        ));
        assert!(matches!(
            XmssLifetime8::expand_activation_time(0, 257),
            Err(XmssError::InvalidActivationParameters { .. })
        ));
        assert!(matches!(
            XmssLifetime8::expand_activation_time(0, 0),
            Err(XmssError::InvalidActivationParameters { .. })
        ));
    }

    #[test]
    fn key_gen_is_deterministic() {
        let (pk_a, sk_a) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
        let (pk_b, sk_b) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
        assert_eq!(pk_a, pk_b);
        assert_eq!(sk_a, sk_b);

        let (pk_c, _) = XmssLifetime8::key_gen(&[0x43; 32], 0, 16).unwrap();
        assert_ne!(pk_a, pk_c);
    }

    #[test]
    fn key_material_matches_seed_stream_vectors() {
        let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();

        let parameter: Vec<u32> = sk.parameter.iter().map(|fe| fe.to_u32()).collect();
        assert_eq!(
            parameter,
            vec![1128497561, 1847509114, 1994249188, 1874424621, 1302548296]
        );
        assert_eq!(
            hex::encode(sk.prf_key),
            "32038786f4803ddcc9a7bbed5ae672df919e469b7e26e9c388d12be81790ccc9"
        );
        assert_eq!(pk.parameter, sk.parameter);
    }

    #[test]
    fn key_gen_rejects_bad_seed_length() {
        assert!(matches!(
            XmssLifetime8::key_gen(&[0u8; 31], 0, 16),
            Err(XmssError::InvalidSeedLength { actual: 31, .. })
        ));
    }

    #[test]
    fn single_epoch_window_expands_to_two_bottom_trees() {
        let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 1).unwrap();
        assert_eq!(XmssLifetime8::prepared_window(&sk), (0, 32));

        let sig = XmssLifetime8::sign(&sk, 0, &MESSAGE).unwrap();
        assert!(XmssLifetime8::verify(&pk, 0, &MESSAGE, &sig));
        assert!(matches!(
            XmssLifetime8::sign(&sk, 1, &MESSAGE),
            Err(XmssError::KeyNotActive { epoch: 1, .. })
        ));
    }

    #[test]
    fn sign_verify_round_trip() {
        let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
        let sig = XmssLifetime8::sign(&sk, 3, &MESSAGE).unwrap();
        assert!(XmssLifetime8::verify(&pk, 3, &MESSAGE, &sig));
    }

    #[test]
    fn wrong_message_is_rejected() {
        let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
        let sig = XmssLifetime8::sign(&sk, 0, &MESSAGE).unwrap();

        let other = *b"goodbye world! goodbye world! ok";
        assert!(!XmssLifetime8::verify(&pk, 0, &other, &sig));
    }

    #[test]
    fn wrong_epoch_is_rejected() {
        let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
        let sig = XmssLifetime8::sign(&sk, 0, &MESSAGE).unwrap();
        assert!(!XmssLifetime8::verify(&pk, 1, &MESSAGE, &sig));
    }

    #[test]
    fn signing_respects_the_activation_window() {
        let (_, sk) = XmssLifetime8::key_gen(&SEED, 100, 10).unwrap();

        // Both window edges sign; one past the end does not.
        assert!(XmssLifetime8::sign(&sk, 100, &MESSAGE).is_ok());
        assert!(XmssLifetime8::sign(&sk, 109, &MESSAGE).is_ok());
        assert!(matches!(
            XmssLifetime8::sign(&sk, 110, &MESSAGE),
            Err(XmssError::KeyNotActive { epoch: 110, .. })
        ));
        assert!(matches!(
            XmssLifetime8::sign(&sk, 99, &MESSAGE),
            Err(XmssError::KeyNotActive { epoch: 99, .. })
        ));
    }

    #[test]
    fn epoch_too_large_is_detected() {
        let (pk, sk) = XmssLifetime8::key_gen(&SEED, 0, 16).unwrap();
        let sig = XmssLifetime8::sign(&sk, 0, &MESSAGE).unwrap();
        assert!(matches!(
            XmssLifetime8::verify_detailed(&pk, 256, &MESSAGE, &sig),
            Err(XmssError::EpochTooLarge { epoch: 256, .. })
        ));
    }

    #[test]
    fn prepared_window_advances_and_saturates() {
        let (pk, mut sk) = XmssLifetime8::key_gen(&SEED, 0, 64).unwrap();
        assert_eq!(XmssLifetime8::prepared_window(&sk), (0, 32));

        // Epoch 40 is active but not prepared yet.
        assert!(matches!(
            XmssLifetime8::sign(&sk, 40, &MESSAGE),
            Err(XmssError::EpochNotPrepared { epoch: 40, .. })
        ));

        XmssLifetime8::advance_preparation(&mut sk).unwrap();
        assert_eq!(XmssLifetime8::prepared_window(&sk), (16, 48));
        let sig = XmssLifetime8::sign(&sk, 40, &MESSAGE).unwrap();
        assert!(XmssLifetime8::verify(&pk, 40, &MESSAGE, &sig));

        // The leftmost epochs fell out of the window.
        assert!(matches!(
            XmssLifetime8::sign(&sk, 5, &MESSAGE),
            Err(XmssError::EpochNotPrepared { epoch: 5, .. })
        ));

        XmssLifetime8::advance_preparation(&mut sk).unwrap();
        assert_eq!(XmssLifetime8::prepared_window(&sk), (32, 64));

        // At the end of the activation range advancing is a no-op.
        let before = sk.clone();
        XmssLifetime8::advance_preparation(&mut sk).unwrap();
        assert_eq!(sk, before);

        let sig = XmssLifetime8::sign(&sk, 63, &MESSAGE).unwrap();
        assert!(XmssLifetime8::verify(&pk, 63, &MESSAGE, &sig));
    }

    #[test]
    fn signatures_from_an_advanced_key_match_the_original_root() {
        // Rebuilt bottom trees must reproduce exactly the leaves that went
        // into the top tree during key generation.
        let (pk, mut sk) = XmssLifetime8::key_gen(&SEED, 0, 48).unwrap();
        XmssLifetime8::advance_preparation(&mut sk).unwrap();
        let sig = XmssLifetime8::sign(&sk, 33, &MESSAGE).unwrap();
        assert!(XmssLifetime8::verify(&pk, 33, &MESSAGE, &sig));
    }
}
