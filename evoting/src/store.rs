use crate::*;
use digest::Digest;
use std::collections::BTreeMap;
use std::ops::Bound;

const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Build a composite key from an object type and its attributes
///
/// Attributes must not contain NUL, which separates them.
pub fn composite_key(object_type: &str, attributes: &[&str]) -> String {
    let mut key = String::new();
    key.push(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_NAMESPACE);
    for attribute in attributes {
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }
    key
}

/// Range `[start, end)` covering every composite key that extends the given partial key
pub fn composite_key_range(object_type: &str, attributes: &[&str]) -> (String, String) {
    let start = composite_key(object_type, attributes);
    let mut end = start.clone();
    end.push(MAX_UNICODE_RUNE);
    (start, end)
}

/// Height at which a value was committed
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub block: u64,
    pub tx: u64,
}

impl Version {
    pub fn new(block: u64, tx: u64) -> Self {
        Version { block, tx }
    }
}

/// A committed value and the version it was committed at
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VersionedValue {
    #[serde(with = "hex_serde")]
    pub value: Vec<u8>,
    pub version: Version,
}

/// SHA-256 as used for private data hashes and ballot commitments
pub fn sha256(bytes: &[u8]) -> Vec<u8> {
    sha2::Sha256::digest(bytes).to_vec()
}

/// Read access to committed ledger state, as seen by a peer
pub trait Store {
    /// Get a value from public world state
    fn get_state(&self, key: &str) -> Option<&VersionedValue>;

    /// Get every public key-value pair in `[start, exclusive_end)`, in key order
    fn range(&self, start: &str, exclusive_end: &str) -> Vec<(&str, &VersionedValue)>;

    /// Get the hash of a private value. Hashes are visible to every peer.
    fn get_private_data_hash(&self, collection: &str, key: &str) -> Option<&VersionedValue>;
}

/// A simple store that uses in-memory BTreeMaps
///
/// Private values are grouped by collection; their hashes are kept apart so
/// that every organization can read them.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct MemStore {
    state: BTreeMap<String, VersionedValue>,
    private_hashes: BTreeMap<String, BTreeMap<String, VersionedValue>>,
    private_data: BTreeMap<String, BTreeMap<String, VersionedValue>>,
}

impl MemStore {
    pub fn set_state(&mut self, key: String, value: Vec<u8>, version: Version) {
        self.state.insert(key, VersionedValue { value, version });
    }

    /// Store a private value in its collection and publish its hash
    pub fn set_private_data(
        &mut self,
        collection: &str,
        key: String,
        value: Vec<u8>,
        version: Version,
    ) {
        let hash = sha256(&value);
        self.private_hashes
            .entry(collection.to_owned())
            .or_default()
            .insert(
                key.clone(),
                VersionedValue {
                    value: hash,
                    version,
                },
            );
        self.private_data
            .entry(collection.to_owned())
            .or_default()
            .insert(key, VersionedValue { value, version });
    }

    /// Read a private value
    ///
    /// Only peers of the collection's member organizations may call this.
    pub fn get_private_data(&self, collection: &str, key: &str) -> Option<&[u8]> {
        self.private_data
            .get(collection)
            .and_then(|c| c.get(key))
            .map(|v| v.value.as_slice())
    }

    /// Number of keys in public world state
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Apply a validated write set at the given version
    pub fn apply(&mut self, rwset: &ReadWriteSet, version: Version) {
        for (key, value) in rwset.writes.iter() {
            self.set_state(key.clone(), value.clone(), version);
        }
        for (collection, writes) in rwset.private_writes.iter() {
            for (key, value) in writes.iter() {
                self.set_private_data(collection, key.clone(), value.clone(), version);
            }
        }
    }
}

impl Store for MemStore {
    fn get_state(&self, key: &str) -> Option<&VersionedValue> {
        self.state.get(key)
    }

    fn range(&self, start: &str, exclusive_end: &str) -> Vec<(&str, &VersionedValue)> {
        if start >= exclusive_end {
            return vec![];
        }

        self.state
            .range::<str, _>((Bound::Included(start), Bound::Excluded(exclusive_end)))
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    fn get_private_data_hash(&self, collection: &str, key: &str) -> Option<&VersionedValue> {
        self.private_hashes.get(collection).and_then(|c| c.get(key))
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_composite_keys() {
        let key = composite_key("vote", &["E1", "abc"]);
        assert_eq!(key, "\u{0}vote\u{0}E1\u{0}abc\u{0}");

        let (start, end) = composite_key_range("vote", &["E1"]);
        assert!(key > start && key < end);

        // Another election with a shared name prefix is outside the range
        let other = composite_key("vote", &["E10", "abc"]);
        assert!(other > end || other < start);
    }

    #[test]
    fn test_memstore_range_and_private_data() {
        let mut store = MemStore::default();
        let v1 = Version::new(1, 0);

        store.set_state("a".into(), b"1".to_vec(), v1);
        store.set_state("b".into(), b"2".to_vec(), v1);
        store.set_state("c".into(), b"3".to_vec(), v1);

        let found: Vec<&str> = store.range("a", "c").into_iter().map(|(k, _)| k).collect();
        assert_eq!(found, vec!["a", "b"]);
        assert!(store.range("c", "a").is_empty());

        store.set_private_data("_implicit_org_Org1MSP", "k".into(), b"secret".to_vec(), v1);
        assert_eq!(
            store.get_private_data("_implicit_org_Org1MSP", "k"),
            Some(&b"secret"[..])
        );
        assert!(store.get_private_data("_implicit_org_Org2MSP", "k").is_none());

        let hash = store
            .get_private_data_hash("_implicit_org_Org1MSP", "k")
            .unwrap();
        assert_eq!(hash.value, sha256(b"secret"));
        assert_eq!(hash.version, v1);

        // Private data never lands in public state
        assert_eq!(store.len(), 3);
    }
}
