//! Persistent rewrite databases keyed by truth tables.

use serde::{Deserialize, Serialize};
use silica_subnet::Subnet;
use silica_tt::{npn_canonize, NpnTransform, TruthTable};
use std::collections::HashMap;

/// Errors from loading or storing a rewrite database.
#[derive(Debug, thiserror::Error)]
pub enum RwDbError {
    /// The byte stream is not a valid database image.
    #[error("malformed rewrite database: {0}")]
    Malformed(String),
}

/// A plain rewrite database: truth table → known replacement subnets.
///
/// Each stored subnet computes exactly the key function of its bucket in
/// its own input variables. The binary image is a bincode encoding of the
/// bucket list.
#[derive(Default, Serialize, Deserialize)]
pub struct RewriteDb {
    buckets: HashMap<TruthTable, Vec<Subnet>>,
}

impl RewriteDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a replacement subnet for `function`.
    pub fn add(&mut self, function: TruthTable, subnet: Subnet) {
        self.buckets.entry(function).or_default().push(subnet);
    }

    /// Returns the stored replacements for `function`.
    pub fn get(&self, function: &TruthTable) -> &[Subnet] {
        self.buckets
            .get(function)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the number of distinct key functions.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if the database holds nothing.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Serializes the database into a binary image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RwDbError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| RwDbError::Malformed(e.to_string()))
    }

    /// Restores a database from a binary image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RwDbError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(db, _)| db)
            .map_err(|e| RwDbError::Malformed(e.to_string()))
    }
}

/// One NPN database entry: the stored subnet and the transform taking the
/// subnet's own function to the bucket's canonical key.
#[derive(Serialize, Deserialize)]
pub struct NpnEntry {
    /// The replacement subnet.
    pub subnet: Subnet,
    /// Canonization transform of the subnet's function.
    pub transform: NpnTransform,
}

/// A rewrite database keyed by NPN-canonical truth tables.
///
/// Functions in one NPN class share a bucket; each entry records the
/// transform needed to adapt the stored subnet to the canonical key, and
/// [`lookup`](Self::lookup) returns the query's own transform alongside
/// so callers can compose the two.
#[derive(Default, Serialize, Deserialize)]
pub struct NpnDb {
    buckets: HashMap<TruthTable, Vec<NpnEntry>>,
}

impl NpnDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a subnet computing `function` under its NPN-canonical key.
    pub fn add(&mut self, function: &TruthTable, subnet: Subnet) {
        let (canon, transform) = npn_canonize(function);
        self.buckets
            .entry(canon)
            .or_default()
            .push(NpnEntry { subnet, transform });
    }

    /// Looks up the NPN class of `function`; returns the bucket and the
    /// transform taking `function` to the canonical key.
    pub fn lookup(&self, function: &TruthTable) -> (&[NpnEntry], NpnTransform) {
        let (canon, transform) = npn_canonize(function);
        let entries = self
            .buckets
            .get(&canon)
            .map(Vec::as_slice)
            .unwrap_or_default();
        (entries, transform)
    }

    /// Returns the number of NPN classes stored.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if the database holds nothing.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Serializes the database into a binary image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RwDbError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| RwDbError::Malformed(e.to_string()))
    }

    /// Restores a database from a binary image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RwDbError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(db, _)| db)
            .map_err(|e| RwDbError::Malformed(e.to_string()))
    }
}
