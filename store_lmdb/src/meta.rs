//! Environment metadata: schema version and the withdrawal id sequence.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use crate::LmdbError;

pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const WITHDRAWAL_SEQ_KEY: &[u8] = b"withdrawal_seq";

pub(crate) fn read_schema_version(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
) -> Result<Option<u32>, LmdbError> {
    match db.get(txn, SCHEMA_VERSION_KEY)? {
        None => Ok(None),
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                LmdbError::Corruption(format!(
                    "schema version has length {}, expected 4",
                    bytes.len()
                ))
            })?;
            Ok(Some(u32::from_le_bytes(arr)))
        }
    }
}

pub(crate) fn write_schema_version(
    db: &Database<Bytes, Bytes>,
    txn: &mut RwTxn,
) -> Result<(), LmdbError> {
    db.put(txn, SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_withdrawal_seq(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
) -> Result<u64, LmdbError> {
    match db.get(txn, WITHDRAWAL_SEQ_KEY)? {
        None => Ok(0),
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                LmdbError::Corruption("withdrawal sequence is not 8 bytes".into())
            })?;
            Ok(u64::from_le_bytes(arr))
        }
    }
}

pub(crate) fn write_withdrawal_seq(
    db: &Database<Bytes, Bytes>,
    txn: &mut RwTxn,
    seq: u64,
) -> Result<(), LmdbError> {
    db.put(txn, WITHDRAWAL_SEQ_KEY, &seq.to_le_bytes())?;
    Ok(())
}
