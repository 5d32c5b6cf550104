//!
//! Crates APIs, essential structs, functions, methods are all here!
//!
//! To quickly understand how to use this crate, have a look at
//! `compute_block_numbers` and `get_missing_block_numbers`.
//!
//! # Example
//!
//! ```rust
//! use bc_data_analyzer::{get_missing_block_numbers, BlockReader, Xrp};
//!
//! let mut reader = BlockReader::open("/data/xrp/ledgers.ndjson.gz").unwrap();
//! let missing = get_missing_block_numbers(&mut reader, &Xrp).unwrap();
//! println!("{} ledgers missing", missing.len());
//! ```
//!

use crate::parser::errors::{OpError, OpResult};
use log::{info, warn};
use rayon::prelude::*;
use std::path::Path;
// re-exports
pub use crate::iter::{BlockIter, Cancellation, ParIter};
pub use crate::parser::chains::{from_name, Blockchain, Tezos, Xrp, CHAIN_NAMES};
pub use crate::parser::errors::{OpErrorKind, ParseError};
pub use crate::parser::proto::actions::ActionsCount;
pub use crate::parser::proto::block::Block;
pub use crate::parser::reader::{BlockReader, RawBlock};

/// number of records parsed together by `count_actions`
pub const ACTIONS_BATCH_SIZE: usize = 1024;

///
/// Open a block archive (`.gz` archives are decompressed on the fly).
///
#[inline]
pub fn open_reader<P: AsRef<Path>>(path: P) -> OpResult<BlockReader> {
    BlockReader::open(path)
}

///
/// Block numbers of every record of the archive, in file order.
///
/// Duplicates are kept. The first record that fails to parse aborts
/// the whole computation; the error carries its line number.
/// The reader is consumed and closed whatever the outcome.
///
/// # Example
///
/// ```rust
/// use bc_data_analyzer::{compute_block_numbers, BlockReader, Tezos};
///
/// let mut reader = BlockReader::open("/data/tezos/blocks.ndjson").unwrap();
/// let numbers = compute_block_numbers(&mut reader, &Tezos).unwrap();
/// assert!(reader.is_closed());
/// ```
///
pub fn compute_block_numbers<C>(reader: &mut BlockReader, chain: &C) -> OpResult<Vec<u64>>
where
    C: Blockchain + ?Sized,
{
    let numbers = BlockIter::new(reader, chain)
        .map(|block| block.map(|b| b.number()))
        .collect::<OpResult<Vec<u64>>>();
    finish(reader, chain, numbers)
}

///
/// Same as `compute_block_numbers`, but stops with a `Cancelled` error
/// at the next record boundary once `cancel` is raised.
///
pub fn compute_block_numbers_with<C>(
    reader: &mut BlockReader,
    chain: &C,
    cancel: &Cancellation,
) -> OpResult<Vec<u64>>
where
    C: Blockchain + ?Sized,
{
    let numbers = BlockIter::new(reader, chain)
        .with_cancellation(cancel.clone())
        .map(|block| block.map(|b| b.number()))
        .collect::<OpResult<Vec<u64>>>();
    finish(reader, chain, numbers)
}

///
/// Block numbers absent from `[min, max]` of the archive, ascending.
///
/// The range is inferred from the data. An empty archive has no
/// missing blocks, and duplicated blocks do not create holes.
///
pub fn get_missing_block_numbers<C>(reader: &mut BlockReader, chain: &C) -> OpResult<Vec<u64>>
where
    C: Blockchain + ?Sized,
{
    let numbers = compute_block_numbers(reader, chain)?;
    Ok(log_missing(missing_block_numbers(&numbers)))
}

/// Cancellable version of `get_missing_block_numbers`.
pub fn get_missing_block_numbers_with<C>(
    reader: &mut BlockReader,
    chain: &C,
    cancel: &Cancellation,
) -> OpResult<Vec<u64>>
where
    C: Blockchain + ?Sized,
{
    let numbers = compute_block_numbers_with(reader, chain, cancel)?;
    Ok(log_missing(missing_block_numbers(&numbers)))
}

///
/// `[min(numbers), max(numbers)] \ numbers`, in ascending order.
///
pub fn missing_block_numbers(numbers: &[u64]) -> Vec<u64> {
    let mut present = numbers.to_vec();
    present.sort_unstable();
    present.dedup();
    let mut missing = Vec::new();
    for pair in present.windows(2) {
        missing.extend(pair[0] + 1..pair[1]);
    }
    missing
}

///
/// Parallel version of `compute_block_numbers`.
///
/// # Performance
///
/// Records are read under a lock but parsed by one worker per cpu.
/// Output is still produced in file order, and the reported error is
/// the first one in file order.
///
/// The reader is owned by the workers and dropped (closed) before
/// this function returns.
///
pub fn par_compute_block_numbers<C>(
    reader: BlockReader,
    chain: C,
    cancel: &Cancellation,
) -> OpResult<Vec<u64>>
where
    C: Blockchain + Clone + 'static,
{
    let name = chain.name();
    let path = reader.path().map(Path::to_path_buf);
    let worker_path = path.clone();
    let mut blocks = ParIter::new(reader, move |raw: OpResult<RawBlock>| {
        let raw = raw?;
        chain
            .parse_block(&raw.data)
            .map(|block| (raw.line, block.number()))
            .map_err(|e| {
                OpError::from(e)
                    .with_path(worker_path.as_deref())
                    .at_line(raw.line)
            })
    });

    let mut numbers = Vec::new();
    // line of the last record handed out, 0 before the first one
    let mut last_line = 0;
    loop {
        if cancel.is_cancelled() {
            let err = OpError::new(OpErrorKind::Cancelled)
                .with_path(path.as_deref())
                .at_line(last_line);
            warn!("stopping parallel {} analysis: {}", name, err);
            return Err(err);
        }
        match blocks.next() {
            Some(Ok((line, number))) => {
                last_line = line;
                numbers.push(number);
            }
            Some(Err(err)) => {
                warn!("stopping parallel {} analysis: {}", name, err);
                return Err(err);
            }
            None => break,
        }
    }
    if blocks.interrupted() {
        return Err(OpError::from("block worker stopped unexpectedly").with_path(path.as_deref()));
    }
    info!("parsed {} {} blocks in parallel", numbers.len(), name);
    Ok(numbers)
}

///
/// Sum of the action histograms of every block of the archive.
///
/// Records are parsed in batches of `ACTIONS_BATCH_SIZE` using rayon.
/// As with `compute_block_numbers`, the first failing record in file
/// order aborts the computation and the reader is closed.
///
pub fn count_actions<C>(reader: &mut BlockReader, chain: &C) -> OpResult<ActionsCount>
where
    C: Blockchain + ?Sized,
{
    count_actions_with(reader, chain, &Cancellation::new())
}

/// Cancellable version of `count_actions`.
pub fn count_actions_with<C>(
    reader: &mut BlockReader,
    chain: &C,
    cancel: &Cancellation,
) -> OpResult<ActionsCount>
where
    C: Blockchain + ?Sized,
{
    let actions = sum_actions(reader, chain, cancel);
    if let Err(err) = &actions {
        warn!("stopping {} action count: {}", chain.name(), err);
    }
    finish(reader, chain, actions)
}

fn sum_actions<C>(
    reader: &mut BlockReader,
    chain: &C,
    cancel: &Cancellation,
) -> OpResult<ActionsCount>
where
    C: Blockchain + ?Sized,
{
    let mut total = ActionsCount::new();
    let mut batch: Vec<RawBlock> = Vec::with_capacity(ACTIONS_BATCH_SIZE);
    loop {
        batch.clear();
        let mut stopped = None;
        while batch.len() < ACTIONS_BATCH_SIZE {
            if cancel.is_cancelled() {
                stopped = Some(
                    OpError::new(OpErrorKind::Cancelled)
                        .with_path(reader.path())
                        .at_line(reader.lines_read()),
                );
                break;
            }
            match reader.next_block() {
                Ok(Some(raw)) => batch.push(raw),
                Ok(None) => break,
                Err(err) => {
                    stopped = Some(err);
                    break;
                }
            }
        }
        let exhausted = batch.len() < ACTIONS_BATCH_SIZE;

        // parse in parallel, merge in file order
        let parsed: Vec<Result<ActionsCount, ParseError>> = batch
            .par_iter()
            .map(|raw| chain.parse_block(&raw.data).map(Block::into_actions_count))
            .collect();
        for (raw, actions) in batch.iter().zip(parsed) {
            match actions {
                Ok(actions) => total.merge(&actions),
                Err(err) => {
                    return Err(OpError::from(err)
                        .with_path(reader.path())
                        .at_line(raw.line))
                }
            }
        }

        if let Some(err) = stopped {
            return Err(err);
        }
        if exhausted {
            return Ok(total);
        }
    }
}

/// close the reader on every exit path and log the outcome
fn finish<C, T>(reader: &mut BlockReader, chain: &C, result: OpResult<T>) -> OpResult<T>
where
    C: Blockchain + ?Sized,
{
    reader.close();
    if result.is_ok() {
        info!(
            "{}: read {} lines from {}",
            chain.name(),
            reader.lines_read(),
            reader
                .path()
                .map_or_else(|| "<stream>".to_owned(), |p| p.display().to_string())
        );
    }
    result
}

fn log_missing(missing: Vec<u64>) -> Vec<u64> {
    if !missing.is_empty() {
        info!("{} blocks missing", missing.len());
    }
    missing
}
