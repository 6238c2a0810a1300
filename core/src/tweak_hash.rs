//! Tweakable hashing on top of Poseidon2.
//!
//! Every hash call binds the public parameter and a tweak that pins down the
//! position of the call inside the scheme (chain step, tree node, or message
//! hash). Single inputs compress at width 16, pairs at width 24, and longer
//! inputs (leaf hashing over all chain ends) go through the width-24 sponge.

use gxmss_constants::{
    CAPACITY, PARAMETER_LEN, TWEAK_LEN, TWEAK_SEPARATOR_FOR_CHAIN_HASH,
    TWEAK_SEPARATOR_FOR_TREE_HASH,
};

use crate::field::{FieldArray, KoalaBear, P};
use crate::poseidon::{
    poseidon_compress, poseidon_sponge, safe_domain_separator, WIDTH_16, WIDTH_24,
};

type F = KoalaBear;

/// Public hash parameter, drawn once per key.
pub type Parameter = FieldArray<PARAMETER_LEN>;

/// Domain separator for one hash invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tweak {
    /// Merkle tree node at (level, position). Level 0 is the leaf layer.
    Tree { level: u8, pos_in_level: u32 },
    /// Chain step: epoch, chain index, and 1-based position in the chain.
    Chain {
        epoch: u32,
        chain_index: u8,
        pos_in_chain: u8,
    },
}

impl Tweak {
    pub fn tree(level: u8, pos_in_level: u32) -> Self {
        Self::Tree {
            level,
            pos_in_level,
        }
    }

    pub fn chain(epoch: u32, chain_index: u8, pos_in_chain: u8) -> Self {
        Self::Chain {
            epoch,
            chain_index,
            pos_in_chain,
        }
    }

    /// Pack the tweak into one integer, then decompose it base-p into
    /// TWEAK_LEN field elements, least significant digit first.
    pub fn to_field_elements(&self) -> [F; TWEAK_LEN] {
        let mut acc: u128 = match *self {
            Self::Tree {
                level,
                pos_in_level,
            } => {
                (((level as u128) + 1) << 40)
                    | ((pos_in_level as u128) << 8)
                    | (TWEAK_SEPARATOR_FOR_TREE_HASH as u128)
            }
            Self::Chain {
                epoch,
                chain_index,
                pos_in_chain,
            } => {
                ((epoch as u128) << 24)
                    | ((chain_index as u128) << 16)
                    | ((pos_in_chain as u128) << 8)
                    | (TWEAK_SEPARATOR_FOR_CHAIN_HASH as u128)
            }
        };

        let mut out = [F::ZERO; TWEAK_LEN];
        for digit in out.iter_mut() {
            *digit = F::from_u32((acc % (P as u128)) as u32);
            acc /= P as u128;
        }
        out
    }
}

/// Apply the tweakable hash to `parameter || tweak || messages`.
///
/// Dispatches on the number of message blocks:
/// one block compresses at width 16, two at width 24, and anything longer is
/// absorbed by the width-24 sponge under a shape-derived domain separator.
pub fn apply<const H: usize>(
    parameter: &Parameter,
    tweak: &Tweak,
    messages: &[FieldArray<H>],
) -> FieldArray<H> {
    let tweak_fe = tweak.to_field_elements();

    let mut input: Vec<F> =
        Vec::with_capacity(PARAMETER_LEN + TWEAK_LEN + messages.len() * H);
    input.extend_from_slice(parameter.inner());
    input.extend_from_slice(&tweak_fe);
    for message in messages {
        input.extend_from_slice(message.inner());
    }

    match messages.len() {
        1 => FieldArray::new(poseidon_compress::<{ WIDTH_16 }, H>(&input)),
        2 => FieldArray::new(poseidon_compress::<{ WIDTH_24 }, H>(&input)),
        n => {
            let lengths = [
                PARAMETER_LEN as u32,
                TWEAK_LEN as u32,
                n as u32,
                H as u32,
            ];
            let capacity_value: FieldArray<{ CAPACITY }> = safe_domain_separator(&lengths);
            FieldArray::new(poseidon_sponge::<H>(capacity_value.inner(), &input))
        }
    }
}

/// Walk a hash chain `steps` positions forward from `start`.
///
/// Chain positions are 1-based: the first hash applied after the PRF output
/// carries pos_in_chain = 1.
pub fn chain<const H: usize>(
    parameter: &Parameter,
    epoch: u32,
    chain_index: u8,
    start_pos_in_chain: u8,
    steps: usize,
    start: &FieldArray<H>,
) -> FieldArray<H> {
    let mut current = *start;

    for j in 0..steps {
        let tweak = Tweak::chain(epoch, chain_index, start_pos_in_chain + j as u8 + 1);
        current = apply(parameter, &tweak, &[current]);
    }

    current
}
