//! Record encoding. Every value is bincode; every key is the UTF-8 id.

use crate::LmdbError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    bincode::serialize(value).map_err(|e| LmdbError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(what: &str, bytes: &[u8]) -> Result<T, LmdbError> {
    bincode::deserialize(bytes).map_err(|e| LmdbError::Corruption(format!("{what}: {e}")))
}
