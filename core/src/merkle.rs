//! Padded Merkle subtrees over domain elements.
//!
//! A subtree is a run of layers from its lowest layer up to its root. Layers
//! keep an explicit `start_index` so partial windows can sit anywhere inside
//! the full tree; before a layer is paired into parents it is padded with
//! RNG-drawn nodes until its start index is even and its end index is odd.
//! Those padding draws come from the key-generation RNG stream and are part
//! of the wire contract.
//!
//! Bottom trees cover aligned power-of-two epoch ranges, so their layers are
//! already exactly pairable and consume no padding draws; they can therefore
//! be rebuilt later from the PRF key alone when the prepared window advances.

use serde::{Deserialize, Serialize};

use crate::field::FieldArray;
use crate::rng::SeedRng;
use crate::tweak_hash::{apply, Parameter, Tweak};

/// One layer of a subtree: nodes for positions
/// `start_index .. start_index + nodes.len()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashTreeLayer<const H: usize> {
    pub start_index: u64,
    pub nodes: Vec<FieldArray<H>>,
}

impl<const H: usize> HashTreeLayer<H> {
    /// Pad a layer so that pairing into parents is exact: a leading RNG node
    /// when the start index is odd, a trailing one when the end index is even.
    /// The front draw happens before the back draw.
    pub fn padded(nodes: Vec<FieldArray<H>>, start_index: u64, rng: &mut SeedRng) -> Self {
        let mut nodes = nodes;
        let mut start_index = start_index;

        if start_index & 1 == 1 {
            nodes.insert(0, rng.random_field_array());
            start_index -= 1;
        }
        if (start_index + nodes.len() as u64 - 1) & 1 == 0 {
            nodes.push(rng.random_field_array());
        }

        Self { start_index, nodes }
    }

    /// Layer over an already exactly-pairable range.
    fn aligned(nodes: Vec<FieldArray<H>>, start_index: u64) -> Self {
        debug_assert_eq!(start_index & 1, 0);
        debug_assert_eq!((start_index + nodes.len() as u64 - 1) & 1, 1);
        Self { start_index, nodes }
    }

    /// Node at a global position within this layer.
    fn node(&self, index: u64) -> &FieldArray<H> {
        &self.nodes[(index - self.start_index) as usize]
    }
}

/// A contiguous run of layers from `lowest_layer` up to the subtree root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashSubTree<const H: usize> {
    pub layers: Vec<HashTreeLayer<H>>,
}

impl<const H: usize> HashSubTree<H> {
    /// Build a subtree with RNG padding on every layer below the root.
    ///
    /// `nodes` is the already-hashed lowest layer, starting at `start_index`
    /// in layer `lowest_layer`; parents are hashed under tree tweaks carrying
    /// their own layer number, up to a single node at layer `depth`.
    pub fn build(
        rng: &mut SeedRng,
        parameter: &Parameter,
        lowest_layer: usize,
        depth: usize,
        start_index: u64,
        nodes: Vec<FieldArray<H>>,
    ) -> Self {
        Self::build_inner(Some(rng), parameter, lowest_layer, depth, start_index, nodes)
    }

    /// Build a subtree whose every layer is already exactly pairable, e.g. a
    /// bottom tree over an aligned power-of-two epoch range. Consumes no RNG.
    pub fn build_aligned(
        parameter: &Parameter,
        lowest_layer: usize,
        depth: usize,
        start_index: u64,
        nodes: Vec<FieldArray<H>>,
    ) -> Self {
        Self::build_inner(None, parameter, lowest_layer, depth, start_index, nodes)
    }

    fn build_inner(
        mut rng: Option<&mut SeedRng>,
        parameter: &Parameter,
        lowest_layer: usize,
        depth: usize,
        start_index: u64,
        nodes: Vec<FieldArray<H>>,
    ) -> Self {
        let mut pad = |nodes: Vec<FieldArray<H>>, start: u64| match rng.as_deref_mut() {
            Some(rng) => HashTreeLayer::padded(nodes, start, rng),
            None => HashTreeLayer::aligned(nodes, start),
        };

        let mut layers = Vec::with_capacity(depth - lowest_layer + 1);
        let mut layer = pad(nodes, start_index);

        for level in lowest_layer..depth {
            let parent_start = layer.start_index / 2;
            let parents: Vec<FieldArray<H>> = layer
                .nodes
                .chunks_exact(2)
                .enumerate()
                .map(|(j, pair)| {
                    let tweak =
                        Tweak::tree((level + 1) as u8, (parent_start + j as u64) as u32);
                    apply(parameter, &tweak, pair)
                })
                .collect();

            let next = if level + 1 < depth {
                pad(parents, parent_start)
            } else {
                HashTreeLayer {
                    start_index: parent_start,
                    nodes: parents,
                }
            };
            layers.push(layer);
            layer = next;
        }
        layers.push(layer);

        Self { layers }
    }

    /// The subtree root (single node of the topmost stored layer).
    pub fn root(&self) -> &FieldArray<H> {
        let top = &self.layers[self.layers.len() - 1];
        &top.nodes[0]
    }

    /// Sibling path for the leaf at `leaf_index` (a global position in the
    /// lowest stored layer): one sibling per layer below the root.
    pub fn auth_path(&self, leaf_index: u64) -> Vec<FieldArray<H>> {
        self.layers[..self.layers.len() - 1]
            .iter()
            .enumerate()
            .map(|(i, layer)| *layer.node((leaf_index >> i) ^ 1))
            .collect()
    }
}
