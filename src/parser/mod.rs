//!
//! This module defines how to turn archive files on disk into `Block` structs defined in proto.
//!

/// read raw block records from (optionally gzipped) NDJSON archives
pub mod reader;

/// per-chain adapters lifting raw records into blocks
pub mod chains;

/// chain-independent block representation
pub mod proto;

/// error handling
pub mod errors;
