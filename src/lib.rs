//!
//! # Introduction
//!
//! This library reads public blockchain archives made of one JSON block
//! per line (XRP Ledger ledgers, Tezos blocks), optionally gzipped.
//!
//! It lifts every record into a chain-independent `Block` (number,
//! transaction count, histogram of action kinds), and checks the
//! coverage of an archive: which block numbers it holds, and which
//! ones are missing between the lowest and the highest.
//!
//! Records are streamed, never loaded all at once.
//!
//! # Example
//!
//! ```rust
//! use bc_data_analyzer::{compute_block_numbers, get_missing_block_numbers, BlockReader, Xrp};
//!
//! let mut reader = BlockReader::open("/data/xrp/ledgers.ndjson").unwrap();
//! let numbers = compute_block_numbers(&mut reader, &Xrp).unwrap();
//!
//! let mut reader = BlockReader::open("/data/xrp/ledgers.ndjson").unwrap();
//! let missing = get_missing_block_numbers(&mut reader, &Xrp).unwrap();
//! ```
//!

pub(crate) mod api;
pub mod iter;
pub mod parser;

#[doc(inline)]
pub use crate::api::*;
#[doc(inline)]
pub use crate::parser::errors::{OpError, OpResult};
