//! Order-independent content hashing.
//!
//! Synthetic `id-col` keys are content hashes: the same logical collection
//! must produce the same identity no matter what order its entries arrived
//! in. Each element is encoded into a tagged canonical byte string, the
//! encodings are sorted, and the sorted sequence is fed through SHA-256.
//! The digest is truncated to 64 bits, which is plenty for join keys.

use crate::types::{DataValue, Row};
use sha2::{Digest, Sha256};

fn encode_value(value: &DataValue, out: &mut Vec<u8>) {
    match value {
        DataValue::None => out.push(0),
        DataValue::Int(i) => {
            out.push(1);
            out.extend_from_slice(&i.to_be_bytes());
        }
        DataValue::Float(f) => {
            out.push(2);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        DataValue::Str(s) => {
            out.push(3);
            out.extend_from_slice(&(s.len() as u64).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        DataValue::Id(id) => {
            out.push(4);
            out.extend_from_slice(&id.to_be_bytes());
        }
    }
}

fn encode_tuple(values: &[DataValue]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(5);
    out.extend_from_slice(&(values.len() as u64).to_be_bytes());
    for value in values {
        encode_value(value, &mut out);
    }
    out
}

fn digest_sorted(mut items: Vec<Vec<u8>>) -> u64 {
    items.sort();
    let mut hasher = Sha256::new();
    for item in &items {
        hasher.update((item.len() as u64).to_be_bytes());
        hasher.update(item);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Hash a collection of scalars. An empty slice is a valid input and yields
/// the hash of the empty collection.
pub fn hash_values(values: &[DataValue]) -> u64 {
    digest_sorted(values.iter().map(|v| encode_tuple(std::slice::from_ref(v))).collect())
}

/// Hash a collection of tuples, e.g. the (key, value) entries of a VDICT.
pub fn hash_rows(rows: &[Row]) -> u64 {
    digest_sorted(rows.iter().map(|r| encode_tuple(r)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let values = vec![DataValue::Int(1), DataValue::from("a")];
        assert_eq!(hash_values(&values), hash_values(&values));
    }

    #[test]
    fn test_hash_ignores_order() {
        let forward = vec![
            DataValue::Int(1),
            DataValue::from("a"),
            DataValue::from("b"),
            DataValue::from("True"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(hash_values(&forward), hash_values(&reversed));
    }

    #[test]
    fn test_hash_rows_ignores_row_order() {
        let a = vec![DataValue::from("a"), DataValue::from("FOO")];
        let b = vec![DataValue::from("b"), DataValue::Int(123)];
        assert_eq!(
            hash_rows(&[a.clone(), b.clone()]),
            hash_rows(&[b, a])
        );
    }

    #[test]
    fn test_hash_distinguishes_pairing() {
        // (a, b) + (c, d) must not collide with (a, d) + (c, b).
        let one = hash_rows(&[
            vec![DataValue::from("a"), DataValue::from("b")],
            vec![DataValue::from("c"), DataValue::from("d")],
        ]);
        let other = hash_rows(&[
            vec![DataValue::from("a"), DataValue::from("d")],
            vec![DataValue::from("c"), DataValue::from("b")],
        ]);
        assert_ne!(one, other);
    }

    #[test]
    fn test_empty_collection_hashes() {
        // "No data" hashes like an empty collection so parents can still
        // form a valid row.
        assert_eq!(hash_values(&[]), hash_rows(&[]));
    }
}
