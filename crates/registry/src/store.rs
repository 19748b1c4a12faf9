//! Append-mostly persistent store for contract records
//!
//! The store is a single file of self-delimiting records:
//!
//! ```text
//! length (u32 LE) | format_version (u8) | bincode payload | crc32 (u32 LE)
//! ```
//!
//! The length field counts everything after itself (version + payload +
//! crc). The checksum covers version + payload. The whole file is replayed
//! at open to rebuild the id sequence and the unique name index.
//!
//! A partial record at the end of the file is a torn write from a crash:
//! the tail is truncated and replay succeeds. A record that fails its
//! checksum mid-file is real corruption and fails the open.

use crate::record::ContractRecord;
use chainhost_core::{Error, Result};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const RECORD_FORMAT_VERSION: u8 = 1;

/// Minimum bytes after the length field: version + crc.
const MIN_RECORD_LEN: usize = 5;

fn encode_record(record: &ContractRecord) -> Result<Vec<u8>> {
    let payload = bincode::serialize(record)?;

    let mut body = Vec::with_capacity(1 + payload.len());
    body.push(RECORD_FORMAT_VERSION);
    body.extend_from_slice(&payload);
    let crc = crc32fast::hash(&body);

    let total_len = body.len() + 4;
    let mut bytes = Vec::with_capacity(4 + total_len);
    bytes.extend_from_slice(&(total_len as u32).to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes.extend_from_slice(&crc.to_le_bytes());
    Ok(bytes)
}

enum DecodeOutcome {
    /// A record and the bytes it consumed.
    Record(ContractRecord, usize),
    /// Fewer bytes than one whole record; only valid at end of file.
    Incomplete,
}

fn decode_record(bytes: &[u8]) -> Result<DecodeOutcome> {
    if bytes.len() < 4 {
        return Ok(DecodeOutcome::Incomplete);
    }
    let length = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if length < MIN_RECORD_LEN {
        return Err(Error::Corruption(format!(
            "registry record length {length} below minimum"
        )));
    }
    if bytes.len() < 4 + length {
        return Ok(DecodeOutcome::Incomplete);
    }

    let body = &bytes[4..4 + length - 4];
    let stored_crc = u32::from_le_bytes([
        bytes[length],
        bytes[length + 1],
        bytes[length + 2],
        bytes[length + 3],
    ]);
    let computed_crc = crc32fast::hash(body);
    if stored_crc != computed_crc {
        return Err(Error::Corruption(format!(
            "registry record checksum mismatch: stored {stored_crc:#010x}, computed {computed_crc:#010x}"
        )));
    }

    let version = body[0];
    if version != RECORD_FORMAT_VERSION {
        return Err(Error::Corruption(format!(
            "unsupported registry record version {version}"
        )));
    }

    let record: ContractRecord = bincode::deserialize(&body[1..])?;
    Ok(DecodeOutcome::Record(record, 4 + length))
}

/// Persistent contract record store.
///
/// Distinct from the ledger object database on purpose: the ledger's
/// contract data is large and mutable, this store is a handful of records
/// that must survive everything. Every append is flushed and synced before
/// it is acknowledged.
pub struct RegistryStore {
    path: PathBuf,
    file: File,
    /// Records indexed by id (ids are dense and sequential).
    records: Vec<ContractRecord>,
    /// Unique secondary index.
    by_name: BTreeMap<String, u64>,
}

impl RegistryStore {
    /// Open a store, replaying any existing records.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or on a corrupt record body. A torn record at
    /// the end of the file is truncated away, not an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut records: Vec<ContractRecord> = Vec::new();
        let mut by_name = BTreeMap::new();
        let mut offset = 0usize;
        while offset < bytes.len() {
            match decode_record(&bytes[offset..])? {
                DecodeOutcome::Record(record, consumed) => {
                    if record.id != records.len() as u64 {
                        return Err(Error::Corruption(format!(
                            "registry record out of sequence: found id {} at position {}",
                            record.id,
                            records.len()
                        )));
                    }
                    if by_name.insert(record.name.clone(), record.id).is_some() {
                        return Err(Error::Corruption(format!(
                            "duplicate contract name in registry: {}",
                            record.name
                        )));
                    }
                    records.push(record);
                    offset += consumed;
                }
                DecodeOutcome::Incomplete => {
                    warn!(
                        target: "chainhost::registry",
                        ?path,
                        dropped = bytes.len() - offset,
                        "Truncating torn record at end of contract registry"
                    );
                    file.set_len(offset as u64)?;
                    break;
                }
            }
        }

        debug!(
            target: "chainhost::registry",
            ?path,
            contracts = records.len(),
            "Opened contract registry store"
        );
        Ok(RegistryStore {
            path,
            file,
            records,
            by_name,
        })
    }

    /// Look up a record by contract name.
    pub fn get_by_name(&self, name: &str) -> Option<&ContractRecord> {
        self.by_name
            .get(name)
            .map(|id| &self.records[*id as usize])
    }

    /// Look up a record by id.
    pub fn get(&self, id: u64) -> Option<&ContractRecord> {
        self.records.get(id as usize)
    }

    /// Append a record for a new contract name and return it.
    ///
    /// The append is synced to disk before this returns: a space
    /// assignment must never be lost once handed out.
    ///
    /// # Errors
    ///
    /// Fails when the name already has a record, or on I/O failure.
    pub fn create(&mut self, name: &str) -> Result<ContractRecord> {
        if self.by_name.contains_key(name) {
            return Err(Error::InvalidOperation(format!(
                "contract {name} already has a registry record"
            )));
        }

        let record = ContractRecord {
            id: self.records.len() as u64,
            name: name.to_string(),
            registered_at: chrono::Utc::now(),
        };

        let bytes = encode_record(&record)?;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        self.file.sync_all()?;

        self.by_name.insert(record.name.clone(), record.id);
        self.records.push(record.clone());
        Ok(record)
    }

    /// All records, in id order.
    pub fn records(&self) -> &[ContractRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore")
            .field("path", &self.path)
            .field("records", &self.records.len())
            .finish()
    }
}
