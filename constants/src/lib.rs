//! Shared constants for generalized XMSS signatures over KoalaBear.
//!
//! Scheme-wide values live at the crate root; each supported key lifetime has
//! its own module with the parameter set that instantiates the scheme.

#![no_std]

/// Message length in bytes (fixed at 32; longer inputs are digested first)
pub const MESSAGE_LENGTH: usize = 32;

/// Public parameter length in field elements
pub const PARAMETER_LEN: usize = 5;

/// Tweak length in field elements
pub const TWEAK_LEN: usize = 2;

/// PRF key length in bytes
pub const PRF_KEY_LENGTH: usize = 32;

/// Sponge capacity in field elements (width-24 sponge)
pub const CAPACITY: usize = 9;

/// Tweak separator for chain hashing
pub const TWEAK_SEPARATOR_FOR_CHAIN_HASH: u8 = 0x00;

/// Tweak separator for Merkle tree hashing
pub const TWEAK_SEPARATOR_FOR_TREE_HASH: u8 = 0x01;

/// Tweak separator for the top-level message hash
pub const TWEAK_SEPARATOR_FOR_MESSAGE_HASH: u8 = 0x02;

/// Parameter set for keys with 2^8 epochs.
pub mod lifetime_2_to_the_8 {
    pub const LOG_LIFETIME: usize = 8;
    pub const DIMENSION: usize = 64;
    pub const CHAIN_BASE: usize = 8;
    pub const FINAL_LAYER: usize = 77;
    pub const TARGET_SUM: usize = 375;
    pub const MSG_LEN_FE: usize = 9;
    pub const RAND_LEN_FE: usize = 7;
    pub const HASH_LEN_FE: usize = 8;
}

/// Parameter set for keys with 2^18 epochs.
pub mod lifetime_2_to_the_18 {
    pub const LOG_LIFETIME: usize = 18;
    pub const DIMENSION: usize = 64;
    pub const CHAIN_BASE: usize = 8;
    pub const FINAL_LAYER: usize = 77;
    pub const TARGET_SUM: usize = 375;
    pub const MSG_LEN_FE: usize = 9;
    pub const RAND_LEN_FE: usize = 6;
    pub const HASH_LEN_FE: usize = 7;
}

/// Parameter set for keys with 2^32 epochs.
pub mod lifetime_2_to_the_32 {
    pub const LOG_LIFETIME: usize = 32;
    pub const DIMENSION: usize = 64;
    pub const CHAIN_BASE: usize = 8;
    pub const FINAL_LAYER: usize = 77;
    pub const TARGET_SUM: usize = 375;
    pub const MSG_LEN_FE: usize = 9;
    pub const RAND_LEN_FE: usize = 7;
    pub const HASH_LEN_FE: usize = 8;
}
