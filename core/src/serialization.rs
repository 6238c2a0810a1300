//! Wire formats: bincode for keys and signatures, SSZ for interop.
//!
//! Bincode uses the crate's serde models directly; field elements are
//! canonical little-endian u32 words, fixed-length arrays carry no prefix,
//! and vectors are prefixed with a little-endian u64 count. The SSZ codecs
//! below lay the same data out as fixed containers with u32 offset tables for
//! the variable-size parts.

use serde::de::DeserializeOwned;
use serde::Serialize;

use gxmss_constants::{PARAMETER_LEN, PRF_KEY_LENGTH};

use crate::error::XmssError;
use crate::field::FieldArray;
use crate::types::{PublicKey, SecretKey, Signature};

/// Byte-level round-tripping through bincode.
pub trait Serializable: Sized {
    fn to_bytes(&self) -> Result<Vec<u8>, XmssError>;
    fn from_bytes(bytes: &[u8]) -> Result<Self, XmssError>;
}

fn bincode_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, XmssError> {
    bincode::serialize(value).map_err(|err| XmssError::DeserializationFailure {
        reason: err.to_string(),
    })
}

fn bincode_decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, XmssError> {
    bincode::deserialize(bytes).map_err(|err| XmssError::DeserializationFailure {
        reason: err.to_string(),
    })
}

impl<const H: usize> Serializable for PublicKey<H> {
    fn to_bytes(&self) -> Result<Vec<u8>, XmssError> {
        bincode_encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, XmssError> {
        bincode_decode(bytes)
    }
}

impl<const H: usize> Serializable for SecretKey<H> {
    fn to_bytes(&self) -> Result<Vec<u8>, XmssError> {
        bincode_encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, XmssError> {
        bincode_decode(bytes)
    }
}

impl<const H: usize, const R: usize> Serializable for Signature<H, R> {
    fn to_bytes(&self) -> Result<Vec<u8>, XmssError> {
        bincode_encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, XmssError> {
        bincode_decode(bytes)
    }
}

/// SSZ codecs. Field elements are canonical little-endian u32; fixed
/// containers are concatenated in field order; variable-size fields are
/// replaced by u32 offsets in the fixed part, payloads appended in order.
pub mod ssz {
    use super::*;
    use crate::field::KoalaBear;
    use crate::merkle::{HashSubTree, HashTreeLayer};

    fn malformed(reason: &str) -> XmssError {
        XmssError::DeserializationFailure {
            reason: reason.to_string(),
        }
    }

    fn push_field_array<const N: usize>(out: &mut Vec<u8>, arr: &FieldArray<N>) {
        for elem in arr.iter() {
            out.extend_from_slice(&elem.to_u32().to_le_bytes());
        }
    }

    fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32, XmssError> {
        let end = *offset + 4;
        let chunk = bytes
            .get(*offset..end)
            .ok_or_else(|| malformed("truncated u32"))?;
        *offset = end;
        Ok(u32::from_le_bytes(chunk.try_into().expect("4-byte slice")))
    }

    fn read_u64(bytes: &[u8], offset: &mut usize) -> Result<u64, XmssError> {
        let end = *offset + 8;
        let chunk = bytes
            .get(*offset..end)
            .ok_or_else(|| malformed("truncated u64"))?;
        *offset = end;
        Ok(u64::from_le_bytes(chunk.try_into().expect("8-byte slice")))
    }

    fn read_field_array<const N: usize>(
        bytes: &[u8],
        offset: &mut usize,
    ) -> Result<FieldArray<N>, XmssError> {
        let mut arr = [KoalaBear::ZERO; N];
        for slot in arr.iter_mut() {
            *slot = KoalaBear::from_u32(read_u32(bytes, offset)?);
        }
        Ok(FieldArray::new(arr))
    }

    /// Public key: root || parameter, 4 * (H + PARAMETER_LEN) bytes.
    pub fn public_key_to_bytes<const H: usize>(pk: &PublicKey<H>) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 * (H + PARAMETER_LEN));
        push_field_array(&mut out, &pk.root);
        push_field_array(&mut out, &pk.parameter);
        out
    }

    pub fn public_key_from_bytes<const H: usize>(
        bytes: &[u8],
    ) -> Result<PublicKey<H>, XmssError> {
        if bytes.len() != 4 * (H + PARAMETER_LEN) {
            return Err(malformed("public key length mismatch"));
        }
        let mut offset = 0;
        let root = read_field_array::<H>(bytes, &mut offset)?;
        let parameter = read_field_array::<PARAMETER_LEN>(bytes, &mut offset)?;
        Ok(PublicKey { root, parameter })
    }

    /// Signature: auth path || rho || hashes, zero-padded up to the container
    /// size fixed by the instantiation.
    pub fn signature_to_bytes<const H: usize, const R: usize>(
        sig: &Signature<H, R>,
        container_len: usize,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(container_len);
        for node in &sig.path {
            push_field_array(&mut out, node);
        }
        push_field_array(&mut out, &sig.rho);
        for hash in &sig.hashes {
            push_field_array(&mut out, hash);
        }
        debug_assert!(out.len() <= container_len);
        out.resize(container_len, 0);
        out
    }

    pub fn signature_from_bytes<const H: usize, const R: usize>(
        bytes: &[u8],
        path_len: usize,
        num_chains: usize,
        container_len: usize,
    ) -> Result<Signature<H, R>, XmssError> {
        if bytes.len() != container_len {
            return Err(malformed("signature container length mismatch"));
        }

        let mut offset = 0;
        let mut path = Vec::with_capacity(path_len);
        for _ in 0..path_len {
            path.push(read_field_array::<H>(bytes, &mut offset)?);
        }
        let rho = read_field_array::<R>(bytes, &mut offset)?;
        let mut hashes = Vec::with_capacity(num_chains);
        for _ in 0..num_chains {
            hashes.push(read_field_array::<H>(bytes, &mut offset)?);
        }

        if bytes[offset..].iter().any(|&b| b != 0) {
            return Err(malformed("nonzero signature padding"));
        }

        Ok(Signature { path, rho, hashes })
    }

    fn tree_to_bytes<const H: usize>(tree: &HashSubTree<H>) -> Vec<u8> {
        // Offset table (u32 per layer, relative to the tree payload), then
        // layer payloads: start_index u64 || raw nodes.
        let mut offsets = Vec::with_capacity(tree.layers.len());
        let mut payload = Vec::new();
        let table_len = 4 * tree.layers.len();
        for layer in &tree.layers {
            offsets.push((table_len + payload.len()) as u32);
            payload.extend_from_slice(&layer.start_index.to_le_bytes());
            for node in &layer.nodes {
                push_field_array(&mut payload, node);
            }
        }

        let mut out = Vec::with_capacity(table_len + payload.len());
        for off in offsets {
            out.extend_from_slice(&off.to_le_bytes());
        }
        out.extend_from_slice(&payload);
        out
    }

    fn tree_from_bytes<const H: usize>(bytes: &[u8]) -> Result<HashSubTree<H>, XmssError> {
        if bytes.len() < 4 {
            return Err(malformed("tree payload too short"));
        }
        let mut offset = 0;
        let first = read_u32(bytes, &mut offset)? as usize;
        if first % 4 != 0 || first == 0 || first > bytes.len() {
            return Err(malformed("bad tree offset table"));
        }
        let num_layers = first / 4;
        let mut offsets = vec![first];
        for _ in 1..num_layers {
            offsets.push(read_u32(bytes, &mut offset)? as usize);
        }
        offsets.push(bytes.len());

        let node_size = 4 * H;
        let mut layers = Vec::with_capacity(num_layers);
        for window in offsets.windows(2) {
            let (start, end) = (window[0], window[1]);
            if end < start + 8 || end > bytes.len() || (end - start - 8) % node_size != 0 {
                return Err(malformed("bad tree layer bounds"));
            }
            let mut cursor = start;
            let start_index = read_u64(bytes, &mut cursor)?;
            let count = (end - start - 8) / node_size;
            let mut nodes = Vec::with_capacity(count);
            for _ in 0..count {
                nodes.push(read_field_array::<H>(bytes, &mut cursor)?);
            }
            layers.push(HashTreeLayer { start_index, nodes });
        }

        Ok(HashSubTree { layers })
    }

    /// Secret key: fixed scalars with u32 offsets standing in for the three
    /// trees, tree payloads appended in field order.
    pub fn secret_key_to_bytes<const H: usize>(sk: &SecretKey<H>) -> Vec<u8> {
        let top = tree_to_bytes(&sk.top_tree);
        let left = tree_to_bytes(&sk.left_bottom_tree);
        let right = tree_to_bytes(&sk.right_bottom_tree);

        let fixed_len = PRF_KEY_LENGTH + 4 * PARAMETER_LEN + 8 + 8 + 4 + 8 + 4 + 4;
        let top_offset = fixed_len;
        let left_offset = top_offset + top.len();
        let right_offset = left_offset + left.len();

        let mut out = Vec::with_capacity(right_offset + right.len());
        out.extend_from_slice(&sk.prf_key);
        push_field_array(&mut out, &sk.parameter);
        out.extend_from_slice(&sk.activation_epoch.to_le_bytes());
        out.extend_from_slice(&sk.num_active_epochs.to_le_bytes());
        out.extend_from_slice(&(top_offset as u32).to_le_bytes());
        out.extend_from_slice(&sk.left_bottom_tree_index.to_le_bytes());
        out.extend_from_slice(&(left_offset as u32).to_le_bytes());
        out.extend_from_slice(&(right_offset as u32).to_le_bytes());
        out.extend_from_slice(&top);
        out.extend_from_slice(&left);
        out.extend_from_slice(&right);
        out
    }

    pub fn secret_key_from_bytes<const H: usize>(
        bytes: &[u8],
    ) -> Result<SecretKey<H>, XmssError> {
        let mut offset = 0;
        let prf_key: [u8; PRF_KEY_LENGTH] = bytes
            .get(..PRF_KEY_LENGTH)
            .ok_or_else(|| malformed("truncated prf key"))?
            .try_into()
            .expect("32-byte slice");
        offset += PRF_KEY_LENGTH;

        let parameter = read_field_array::<PARAMETER_LEN>(bytes, &mut offset)?;
        let activation_epoch = read_u64(bytes, &mut offset)?;
        let num_active_epochs = read_u64(bytes, &mut offset)?;
        let top_offset = read_u32(bytes, &mut offset)? as usize;
        let left_bottom_tree_index = read_u64(bytes, &mut offset)?;
        let left_offset = read_u32(bytes, &mut offset)? as usize;
        let right_offset = read_u32(bytes, &mut offset)? as usize;

        if top_offset != offset
            || left_offset < top_offset
            || right_offset < left_offset
            || right_offset > bytes.len()
        {
            return Err(malformed("bad secret key offsets"));
        }

        let top_tree = tree_from_bytes(&bytes[top_offset..left_offset])?;
        let left_bottom_tree = tree_from_bytes(&bytes[left_offset..right_offset])?;
        let right_bottom_tree = tree_from_bytes(&bytes[right_offset..])?;

        Ok(SecretKey {
            prf_key,
            parameter,
            activation_epoch,
            num_active_epochs,
            top_tree,
            left_bottom_tree_index,
            left_bottom_tree,
            right_bottom_tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::KoalaBear;
    use crate::merkle::{HashSubTree, HashTreeLayer};

    type F = KoalaBear;

    fn field_array<const N: usize>(fill: u32) -> FieldArray<N> {
        FieldArray::new(core::array::from_fn(|i| F::from_u32(i as u32 + fill)))
    }

    fn sample_tree() -> HashSubTree<8> {
        HashSubTree {
            layers: vec![
                HashTreeLayer {
                    start_index: 2,
                    nodes: vec![field_array(10), field_array(20)],
                },
                HashTreeLayer {
                    start_index: 1,
                    nodes: vec![field_array(30)],
                },
            ],
        }
    }

    fn sample_public_key() -> PublicKey<8> {
        PublicKey {
            root: field_array(1),
            parameter: field_array(100),
        }
    }

    fn sample_signature() -> Signature<8, 7> {
        Signature {
            path: (0..8).map(|i| field_array(i * 11)).collect(),
            rho: field_array(500),
            hashes: (0..64).map(|i| field_array(i * 13)).collect(),
        }
    }

    fn sample_secret_key() -> SecretKey<8> {
        SecretKey {
            prf_key: [0x5C; 32],
            parameter: field_array(100),
            activation_epoch: 7,
            num_active_epochs: 42,
            top_tree: sample_tree(),
            left_bottom_tree_index: 3,
            left_bottom_tree: sample_tree(),
            right_bottom_tree: sample_tree(),
        }
    }

    #[test]
    fn public_key_bincode_layout() {
        let pk = sample_public_key();
        let bytes = pk.to_bytes().unwrap();

        // Fixed arrays carry no prefix: 8 root words then 5 parameter words.
        assert_eq!(bytes.len(), 4 * (8 + 5));
        assert_eq!(
            u32::from_le_bytes(bytes[..4].try_into().unwrap()),
            pk.root.inner()[0].to_u32()
        );
        assert_eq!(PublicKey::<8>::from_bytes(&bytes).unwrap(), pk);
    }

    #[test]
    fn signature_bincode_layout_and_round_trip() {
        let sig = sample_signature();
        let bytes = sig.to_bytes().unwrap();

        // Vec prefix: path length as u64 LE.
        assert_eq!(
            u64::from_le_bytes(bytes[..8].try_into().unwrap()),
            sig.path.len() as u64
        );
        // path nodes || rho || hashes prefix.
        let hashes_prefix = 8 + 8 * 8 * 4 + 7 * 4;
        assert_eq!(
            u64::from_le_bytes(bytes[hashes_prefix..hashes_prefix + 8].try_into().unwrap()),
            sig.hashes.len() as u64
        );
        assert_eq!(Signature::<8, 7>::from_bytes(&bytes).unwrap(), sig);
    }

    #[test]
    fn secret_key_bincode_layout_and_round_trip() {
        let sk = sample_secret_key();
        let bytes = sk.to_bytes().unwrap();

        // prf_key (32) || parameter (20) || activation u64 || num u64 ...
        assert_eq!(&bytes[..32], &[0x5C; 32]);
        assert_eq!(u64::from_le_bytes(bytes[52..60].try_into().unwrap()), 7);
        assert_eq!(u64::from_le_bytes(bytes[60..68].try_into().unwrap()), 42);
        // ... || top tree: layer count u64, then first layer start_index u64
        // and node-count u64.
        assert_eq!(u64::from_le_bytes(bytes[68..76].try_into().unwrap()), 2);
        assert_eq!(u64::from_le_bytes(bytes[76..84].try_into().unwrap()), 2);
        assert_eq!(u64::from_le_bytes(bytes[84..92].try_into().unwrap()), 2);

        assert_eq!(SecretKey::<8>::from_bytes(&bytes).unwrap(), sk);
    }

    #[test]
    fn bincode_rejects_truncated_input() {
        let bytes = sample_public_key().to_bytes().unwrap();
        assert!(matches!(
            PublicKey::<8>::from_bytes(&bytes[..bytes.len() - 1]),
            Err(XmssError::DeserializationFailure { .. })
        ));
    }

    #[test]
    fn ssz_public_key_round_trip() {
        let pk = sample_public_key();
        let bytes = ssz::public_key_to_bytes(&pk);
        assert_eq!(bytes.len(), 52);
        assert_eq!(ssz::public_key_from_bytes::<8>(&bytes).unwrap(), pk);

        assert!(ssz::public_key_from_bytes::<8>(&bytes[..51]).is_err());
    }

    #[test]
    fn ssz_signature_round_trip_with_padding() {
        let sig = sample_signature();
        let bytes = ssz::signature_to_bytes(&sig, 3116);
        assert_eq!(bytes.len(), 3116);

        // Natural content is 8*32 + 28 + 64*32 = 2332 bytes; the tail is
        // zero padding.
        assert!(bytes[2332..].iter().all(|&b| b == 0));

        let back = ssz::signature_from_bytes::<8, 7>(&bytes, 8, 64, 3116).unwrap();
        assert_eq!(back, sig);

        let mut tampered = bytes.clone();
        tampered[3000] = 1;
        assert!(ssz::signature_from_bytes::<8, 7>(&tampered, 8, 64, 3116).is_err());
    }

    #[test]
    fn ssz_secret_key_round_trip() {
        let sk = sample_secret_key();
        let bytes = ssz::secret_key_to_bytes(&sk);
        assert_eq!(ssz::secret_key_from_bytes::<8>(&bytes).unwrap(), sk);

        assert!(ssz::secret_key_from_bytes::<8>(&bytes[..40]).is_err());
    }
}
