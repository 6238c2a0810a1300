//! Poseidon2 permutation over KoalaBear, widths 16 and 24.
//!
//! Width 16 backs single-input compression (chain steps), width 24 backs
//! two-input compression (tree merges) and the sponge (leaf hashing). The
//! permutations come from `p3-koala-bear`, so the round constants and linear
//! layers are the published KoalaBear tables and every hash output is
//! byte-compatible with other implementations built on them. Field elements
//! cross the boundary in canonical form.

use std::sync::OnceLock;

use p3_field::PrimeField32;
use p3_koala_bear::{
    default_koalabear_poseidon2_16, default_koalabear_poseidon2_24, Poseidon2KoalaBear,
};
use p3_symmetric::Permutation;

use crate::field::{FieldArray, KoalaBear, P};

type F = KoalaBear;

/// Permutation width for single-input compression.
pub const WIDTH_16: usize = 16;
/// Permutation width for pair compression and the sponge.
pub const WIDTH_24: usize = 24;

/// Number of length fields absorbed into the sponge domain separator.
const DOMAIN_PARAMETERS_LENGTH: usize = 4;

static POSEIDON2_16: OnceLock<Poseidon2KoalaBear<16>> = OnceLock::new();
static POSEIDON2_24: OnceLock<Poseidon2KoalaBear<24>> = OnceLock::new();

/// Width-16 Poseidon2 permutation with the default KoalaBear constants.
pub fn poseidon2_16() -> &'static Poseidon2KoalaBear<16> {
    POSEIDON2_16.get_or_init(default_koalabear_poseidon2_16)
}

/// Width-24 Poseidon2 permutation with the default KoalaBear constants.
pub fn poseidon2_24() -> &'static Poseidon2KoalaBear<24> {
    POSEIDON2_24.get_or_init(default_koalabear_poseidon2_24)
}

fn permute_16_lanes(state: &mut [F]) {
    let mut lanes = [p3_koala_bear::KoalaBear::new(0); WIDTH_16];
    for (lane, src) in lanes.iter_mut().zip(state.iter()) {
        *lane = p3_koala_bear::KoalaBear::new(src.to_u32());
    }
    let permuted = poseidon2_16().permute(lanes);
    for (dst, lane) in state.iter_mut().zip(permuted.iter()) {
        *dst = F::from_u32(lane.as_canonical_u32());
    }
}

fn permute_24_lanes(state: &mut [F]) {
    let mut lanes = [p3_koala_bear::KoalaBear::new(0); WIDTH_24];
    for (lane, src) in lanes.iter_mut().zip(state.iter()) {
        *lane = p3_koala_bear::KoalaBear::new(src.to_u32());
    }
    let permuted = poseidon2_24().permute(lanes);
    for (dst, lane) in state.iter_mut().zip(permuted.iter()) {
        *dst = F::from_u32(lane.as_canonical_u32());
    }
}

/// Poseidon2 permutation. The state length selects the width and must be
/// 16 or 24.
pub fn permute(state: &mut [F]) {
    match state.len() {
        WIDTH_16 => permute_16_lanes(state),
        WIDTH_24 => permute_24_lanes(state),
        width => unreachable!("unsupported Poseidon2 width {width}"),
    }
}

/// S-box: x -> x^3.
#[inline]
fn sbox(x: F) -> F {
    x.square() * x
}

/// Diagonal of the width-16 internal linear layer, lanes 1..16. Lane 0 is
/// handled by the `part_sum - state[0]` rule in the round itself.
pub fn diagonal_16() -> [F; 15] {
    let one = F::ONE;
    let two = one.double();
    let three = F::from_u32(3);
    let four = F::from_u32(4);
    let half = one.halve();
    [
        one,
        two,
        half,
        three,
        four,
        -half,
        -three,
        -four,
        one.div_2exp(8),
        one.div_2exp(3),
        one.div_2exp(24),
        -one.div_2exp(8),
        -one.div_2exp(3),
        -one.div_2exp(4),
        -one.div_2exp(24),
    ]
}

/// One width-16 internal round: add the round constant to lane 0, apply the
/// x^3 S-box to lane 0, then the internal linear layer.
///
/// The ordering is normative for cross-implementation agreement: both sums
/// are read before lane 0 is rewritten, and each diagonal multiply acts on
/// the reduced lane value.
pub fn internal_round_16(state: &mut [F; WIDTH_16], rc: F) {
    state[0] = sbox(state[0] + rc);

    let part_sum = state[1..].iter().fold(F::ZERO, |acc, &x| acc + x);
    let full_sum = part_sum + state[0];
    state[0] = part_sum - state[0];
    for (lane, v) in state[1..].iter_mut().zip(diagonal_16()) {
        *lane = v * *lane + full_sum;
    }
}

/// Compression: Truncate(Permute(x) + x), x zero-padded to WIDTH.
pub fn poseidon_compress<const WIDTH: usize, const OUT_LEN: usize>(input: &[F]) -> [F; OUT_LEN] {
    assert!(
        input.len() <= WIDTH,
        "Poseidon compression: input must fit the permutation width."
    );
    assert!(
        OUT_LEN <= WIDTH,
        "Poseidon compression: output must fit the permutation width."
    );

    let mut padded = [F::ZERO; WIDTH];
    padded[..input.len()].copy_from_slice(input);

    let mut state = padded;
    permute(&mut state);

    for (lane, &fed) in state.iter_mut().zip(&padded) {
        *lane += fed;
    }

    let mut out = [F::ZERO; OUT_LEN];
    out.copy_from_slice(&state[..OUT_LEN]);
    out
}

/// Sponge over width 24. The capacity section of the initial state carries a
/// domain-separator digest; the input is zero-padded to a whole number of
/// rate-sized blocks.
pub fn poseidon_sponge<const OUT_LEN: usize>(capacity_value: &[F], input: &[F]) -> [F; OUT_LEN] {
    assert!(
        capacity_value.len() < WIDTH_24,
        "Sponge capacity must be smaller than the state width."
    );

    let rate = WIDTH_24 - capacity_value.len();
    let extra = (rate - (input.len() % rate)) % rate;
    let mut blocks = input.to_vec();
    blocks.resize(input.len() + extra, F::ZERO);

    let mut state = [F::ZERO; WIDTH_24];
    state[rate..].copy_from_slice(capacity_value);

    for chunk in blocks.chunks(rate) {
        for (lane, &elem) in state.iter_mut().zip(chunk) {
            *lane += elem;
        }
        permute(&mut state);
    }

    let mut out = Vec::with_capacity(OUT_LEN);
    while out.len() < OUT_LEN {
        out.extend_from_slice(&state[..rate]);
        permute(&mut state);
    }

    let mut result = [F::ZERO; OUT_LEN];
    result.copy_from_slice(&out[..OUT_LEN]);
    result
}

/// Domain-separator digest for the sponge capacity, derived from the shape of
/// the hash call (parameter length, tweak length, message count, output
/// length).
pub fn safe_domain_separator<const OUT_LEN: usize>(
    lengths: &[u32; DOMAIN_PARAMETERS_LENGTH],
) -> FieldArray<OUT_LEN> {
    let mut acc: u128 = 0;
    for &len in lengths {
        acc = (acc << 32) | (len as u128);
    }

    let mut input = [F::ZERO; WIDTH_24];
    for digit in input.iter_mut() {
        *digit = F::from_u32((acc % (P as u128)) as u32);
        acc /= P as u128;
    }

    FieldArray::new(poseidon_compress::<{ WIDTH_24 }, OUT_LEN>(&input))
}
