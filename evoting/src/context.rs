use crate::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of a range query, kept so that phantom inserts can be detected at commit
#[derive(Clone, Debug, PartialEq)]
pub struct RangeRead {
    pub start: String,
    pub end: String,
    pub results: Vec<(String, Version)>,
}

/// What a simulated transaction read and what it wants to write
///
/// Reads record the version seen (`None` if the key was absent). Nothing here
/// is applied until the ledger has validated every read against current state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadWriteSet {
    pub reads: BTreeMap<String, Option<Version>>,
    pub range_reads: Vec<RangeRead>,
    pub hash_reads: BTreeMap<String, BTreeMap<String, Option<Version>>>,
    pub writes: BTreeMap<String, Vec<u8>>,
    pub private_writes: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl ReadWriteSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty() && self.private_writes.is_empty()
    }
}

/// The stub handed to the contract for one simulated invocation on one peer
pub struct TxContext<'a, S: Store> {
    store: &'a S,
    tx_id: TransactionId,
    creator: &'a Identity,
    peer_org: &'a OrgId,
    transient: &'a TransientMap,
    rwset: ReadWriteSet,
}

impl<'a, S: Store> TxContext<'a, S> {
    pub fn new(
        store: &'a S,
        tx_id: TransactionId,
        creator: &'a Identity,
        peer_org: &'a OrgId,
        transient: &'a TransientMap,
    ) -> Self {
        TxContext {
            store,
            tx_id,
            creator,
            peer_org,
            transient,
            rwset: ReadWriteSet::default(),
        }
    }

    pub fn tx_id(&self) -> TransactionId {
        self.tx_id
    }

    pub fn creator(&self) -> &Identity {
        self.creator
    }

    /// Organization of the peer running this simulation
    pub fn peer_org(&self) -> &OrgId {
        self.peer_org
    }

    pub fn transient(&self, key: &str) -> Option<&[u8]> {
        self.transient.get(key).map(|v| v.as_slice())
    }

    /// Read committed public state. Pending writes of this transaction are not visible.
    pub fn get_state(&mut self, key: &str) -> Option<Vec<u8>> {
        let found = self.store.get_state(key);
        self.rwset
            .reads
            .insert(key.to_owned(), found.map(|v| v.version));
        found.map(|v| v.value.clone())
    }

    pub fn get_state_range(&mut self, start: &str, end: &str) -> Vec<(String, Vec<u8>)> {
        let found = self.store.range(start, end);

        self.rwset.range_reads.push(RangeRead {
            start: start.to_owned(),
            end: end.to_owned(),
            results: found
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.version))
                .collect(),
        });

        found
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.value.clone()))
            .collect()
    }

    pub fn get_private_data_hash(&mut self, collection: &str, key: &str) -> Option<Vec<u8>> {
        let found = self.store.get_private_data_hash(collection, key);
        self.rwset
            .hash_reads
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), found.map(|v| v.version));
        found.map(|v| v.value.clone())
    }

    pub fn put_state(&mut self, key: String, value: Vec<u8>) {
        self.rwset.writes.insert(key, value);
    }

    pub fn put_private_data(&mut self, collection: &str, key: String, value: Vec<u8>) {
        self.rwset
            .private_writes
            .entry(collection.to_owned())
            .or_default()
            .insert(key, value);
    }

    /// Read and unpack a CBOR-packed record
    pub fn get_record<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, Error> {
        match self.get_state(key) {
            Some(packed) => Ok(Some(serde_cbor::from_slice(&packed)?)),
            None => Ok(None),
        }
    }

    /// Pack a record with CBOR and write it
    pub fn put_record<T: Serialize>(&mut self, key: String, record: &T) -> Result<(), Error> {
        let packed = serde_cbor::to_vec(record)?;
        self.put_state(key, packed);
        Ok(())
    }

    pub fn into_rwset(self) -> ReadWriteSet {
        self.rwset
    }
}
