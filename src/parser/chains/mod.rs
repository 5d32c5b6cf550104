//!
//! Chain adapters: lift one raw archive record into a `Block`.
//!
//! Adapters hold no state, so a single value can be shared by any
//! number of threads. New chains plug in by implementing `Blockchain`.
//!

mod tezos;
mod xrp;

pub use tezos::Tezos;
pub use xrp::Xrp;

use crate::parser::errors::ParseError;
use crate::parser::proto::block::Block;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// names accepted by `from_name`
pub const CHAIN_NAMES: [&str; 2] = [Xrp::NAME, Tezos::NAME];

///
/// Capability of a blockchain: identify itself and parse its blocks.
///
pub trait Blockchain: Send + Sync {
    /// short lowercase chain name, e.g. `xrp`
    fn name(&self) -> &'static str;

    /// parse one record produced by `BlockReader`
    fn parse_block(&self, raw: &[u8]) -> Result<Block, ParseError>;
}

impl<T: Blockchain + ?Sized> Blockchain for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn parse_block(&self, raw: &[u8]) -> Result<Block, ParseError> {
        (**self).parse_block(raw)
    }
}

impl<T: Blockchain + ?Sized> Blockchain for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn parse_block(&self, raw: &[u8]) -> Result<Block, ParseError> {
        (**self).parse_block(raw)
    }
}

///
/// Look up an adapter by its name (case-insensitive).
///
/// Returns `None` for chains this crate does not know.
///
pub fn from_name(name: &str) -> Option<Box<dyn Blockchain>> {
    match name.to_ascii_lowercase().as_str() {
        Xrp::NAME => Some(Box::new(Xrp)),
        Tezos::NAME => Some(Box::new(Tezos)),
        _ => None,
    }
}

///
/// Decode a record straight into the adapter's typed shape.
///
/// Fields the shape does not name are skipped without being built.
/// `Ok(None)` means the record is well-formed JSON of another shape;
/// the adapter then walks it as a `Value` to name the offending field.
///
pub(crate) fn decode_record<T: DeserializeOwned>(raw: &[u8]) -> Result<Option<T>, ParseError> {
    match serde_json::from_slice(raw) {
        Ok(record) => Ok(Some(record)),
        Err(err) if err.is_data() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

// JSON navigation shared by the adapters

#[inline]
pub(crate) fn parse_object(raw: &[u8]) -> Result<Map<String, Value>, ParseError> {
    match serde_json::from_slice(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::mismatch("block", "object")),
    }
}

#[inline]
pub(crate) fn field<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Value, ParseError> {
    object.get(key).ok_or_else(|| ParseError::missing(path))
}

#[inline]
pub(crate) fn as_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ParseError> {
    value
        .as_array()
        .ok_or_else(|| ParseError::mismatch(path, "array"))
}

#[inline]
pub(crate) fn as_object<'a>(
    value: &'a Value,
    path: &str,
) -> Result<&'a Map<String, Value>, ParseError> {
    value
        .as_object()
        .ok_or_else(|| ParseError::mismatch(path, "object"))
}
