//! Key and signature types.
//!
//! Field order on every struct is the bincode wire order; see the
//! serialization module for the byte layouts.

use serde::{Deserialize, Serialize};

use gxmss_constants::PRF_KEY_LENGTH;

use crate::field::FieldArray;
use crate::merkle::HashSubTree;
use crate::tweak_hash::Parameter;

/// Public key: the top-tree root and the hash parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey<const H: usize> {
    pub root: FieldArray<H>,
    pub parameter: Parameter,
}

/// Signature: one Merkle sibling per tree level, the encoding randomness, and
/// one intermediate chain hash per chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature<const H: usize, const R: usize> {
    pub path: Vec<FieldArray<H>>,
    pub rho: FieldArray<R>,
    pub hashes: Vec<FieldArray<H>>,
}

/// Secret key.
///
/// The parameter and PRF key are immutable for the life of the key. The two
/// cached bottom trees cover the prepared window of consecutive epochs;
/// `advance_preparation` on the scheme slides them to the right.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey<const H: usize> {
    pub prf_key: [u8; PRF_KEY_LENGTH],
    pub parameter: Parameter,
    pub activation_epoch: u64,
    pub num_active_epochs: u64,
    pub top_tree: HashSubTree<H>,
    pub left_bottom_tree_index: u64,
    pub left_bottom_tree: HashSubTree<H>,
    pub right_bottom_tree: HashSubTree<H>,
}
