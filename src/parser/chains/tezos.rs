use crate::parser::chains::{
    as_array, as_object, decode_record, field, parse_object, Blockchain,
};
use crate::parser::errors::ParseError;
use crate::parser::proto::actions::ActionsCount;
use crate::parser::proto::block::Block;
use serde::Deserialize;
use serde_json::Value;

///
/// Tezos adapter.
///
/// Tezos groups operations by validation pass (`operations` is an array
/// of up to four arrays). Each operation group counts as one transaction;
/// each entry of its `contents` counts as one action, keyed by `kind`.
/// A block therefore has at least as many actions as transactions.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tezos;

impl Tezos {
    pub const NAME: &'static str = "tezos";
}

#[derive(Debug, Deserialize)]
struct JsonBlock {
    header: JsonHeader,
    /// validation passes of operation groups
    operations: Vec<Vec<JsonGroup>>,
}

#[derive(Debug, Deserialize)]
struct JsonHeader {
    level: u64,
}

#[derive(Debug, Deserialize)]
struct JsonGroup {
    contents: Vec<JsonContent>,
}

#[derive(Debug, Deserialize)]
struct JsonContent {
    kind: String,
}

impl Blockchain for Tezos {
    fn name(&self) -> &'static str {
        Tezos::NAME
    }

    fn parse_block(&self, raw: &[u8]) -> Result<Block, ParseError> {
        let block: JsonBlock = match decode_record(raw)? {
            Some(block) => block,
            None => return parse_irregular(raw),
        };
        let mut groups = 0u64;
        let mut actions = ActionsCount::new();
        for group in block.operations.iter().flatten() {
            groups += 1;
            for content in &group.contents {
                actions.increment(&content.kind);
            }
        }
        Ok(Block::new(block.header.level, groups, actions))
    }
}

/// walks the record as a `Value` to name the field that breaks the shape
fn parse_irregular(raw: &[u8]) -> Result<Block, ParseError> {
    let block = parse_object(raw)?;
    let header = as_object(field(&block, "header", "header")?, "header")?;
    let number = field(header, "level", "header.level")?
        .as_u64()
        .ok_or_else(|| ParseError::mismatch("header.level", "unsigned integer"))?;

    let passes = as_array(field(&block, "operations", "operations")?, "operations")?;
    let mut groups = 0u64;
    let mut actions = ActionsCount::new();
    for pass in passes {
        for group in as_array(pass, "operations[]")? {
            groups += 1;
            count_contents(group, &mut actions)?;
        }
    }

    Ok(Block::new(number, groups, actions))
}

fn count_contents(group: &Value, actions: &mut ActionsCount) -> Result<(), ParseError> {
    let group = as_object(group, "operations[][]")?;
    let contents = as_array(field(group, "contents", "contents")?, "contents")?;
    for content in contents {
        let kind = field(as_object(content, "contents[]")?, "kind", "kind")?
            .as_str()
            .ok_or_else(|| ParseError::mismatch("kind", "string"))?;
        actions.increment(kind);
    }
    Ok(())
}
