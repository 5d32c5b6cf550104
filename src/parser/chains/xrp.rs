use crate::parser::chains::{as_array, decode_record, field, parse_object, Blockchain};
use crate::parser::errors::ParseError;
use crate::parser::proto::actions::ActionsCount;
use crate::parser::proto::block::Block;
use serde::Deserialize;
use serde_json::Value;

const UNKNOWN_TYPE: &str = "unknown";
const LEDGER_INDEX_EXPECTED: &str = "unsigned integer or decimal string";

///
/// XRP Ledger adapter.
///
/// Expects ledgers as returned by the `ledger` RPC with expanded
/// transactions. Every transaction is exactly one action, keyed by its
/// lowercased `TransactionType`.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Xrp;

impl Xrp {
    pub const NAME: &'static str = "xrp";
}

/// the parts of a ledger this adapter reads
#[derive(Debug, Deserialize)]
struct JsonLedger {
    ledger_index: Value,
    transactions: Vec<JsonTransaction>,
}

#[derive(Debug, Deserialize)]
struct JsonTransaction {
    #[serde(rename = "TransactionType")]
    transaction_type: Option<String>,
}

impl Blockchain for Xrp {
    fn name(&self) -> &'static str {
        Xrp::NAME
    }

    fn parse_block(&self, raw: &[u8]) -> Result<Block, ParseError> {
        let ledger: JsonLedger = match decode_record(raw)? {
            Some(ledger) => ledger,
            None => return parse_irregular(raw),
        };
        let number = parse_ledger_index(&ledger.ledger_index)?;

        let mut actions = ActionsCount::new();
        for tx in &ledger.transactions {
            let kind = tx.transaction_type.as_deref().unwrap_or(UNKNOWN_TYPE);
            actions.increment(&kind.to_lowercase());
        }

        Ok(Block::new(number, ledger.transactions.len() as u64, actions))
    }
}

/// ledgers with missing fields or odd transaction entries
fn parse_irregular(raw: &[u8]) -> Result<Block, ParseError> {
    let ledger = parse_object(raw)?;
    let number = parse_ledger_index(field(&ledger, "ledger_index", "ledger_index")?)?;
    let transactions = as_array(
        field(&ledger, "transactions", "transactions")?,
        "transactions",
    )?;

    let mut actions = ActionsCount::new();
    for tx in transactions {
        actions.increment(&transaction_type(tx).to_lowercase());
    }

    Ok(Block::new(number, transactions.len() as u64, actions))
}

/// ledger indices come either as JSON integers or as base-10 strings
fn parse_ledger_index(value: &Value) -> Result<u64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse::<u64>().ok()
        }
        _ => None,
    };
    parsed.ok_or_else(|| ParseError::mismatch("ledger_index", LEDGER_INDEX_EXPECTED))
}

#[inline]
fn transaction_type(tx: &Value) -> &str {
    tx.get("TransactionType")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Block, ParseError> {
        Xrp.parse_block(json.as_bytes())
    }

    #[test]
    fn test_parse_ledger() {
        let block = parse(
            r#"{"ledger_index": "54387329", "close_time": 636920841, "transactions": [
                {"TransactionType": "Payment", "Fee": "12"},
                {"TransactionType": "OfferCreate"},
                {"TransactionType": "Payment"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(block.number(), 54387329);
        assert_eq!(block.transactions_count(), 3);
        assert_eq!(block.actions_count().get("payment"), 2);
        assert_eq!(block.actions_count().get("offercreate"), 1);
        assert_eq!(block.actions_count().total(), block.transactions_count());
    }

    #[test]
    fn test_integer_ledger_index() {
        let block = parse(r#"{"ledger_index": 124, "transactions": []}"#).unwrap();
        assert_eq!(block.number(), 124);
        assert_eq!(block.transactions_count(), 0);
        assert!(block.actions_count().is_empty());
    }

    #[test]
    fn test_unknown_transaction_types() {
        let block = parse(
            r#"{"ledger_index": 1, "transactions": [{"Account": "r9"}, {"TransactionType": 7}, "tx"]}"#,
        )
        .unwrap();
        assert_eq!(block.actions_count().get("unknown"), 3);
        assert_eq!(block.actions_count().total(), 3);
    }

    #[test]
    fn test_rejects_bad_ledger_index() {
        let expected = ParseError::mismatch("ledger_index", LEDGER_INDEX_EXPECTED);
        for index in &["\"0x1f\"", "\"-4\"", "-4", "1.5", "true", "\"\"", "\" 12\""] {
            let json = format!(r#"{{"ledger_index": {}, "transactions": []}}"#, index);
            assert_eq!(parse(&json).unwrap_err(), expected, "index {}", index);
        }
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            parse(r#"{"transactions": []}"#).unwrap_err(),
            ParseError::missing("ledger_index")
        );
        assert_eq!(
            parse(r#"{"ledger_index": 3}"#).unwrap_err(),
            ParseError::missing("transactions")
        );
        assert_eq!(
            parse(r#"{"ledger_index": 3, "transactions": {}}"#).unwrap_err(),
            ParseError::mismatch("transactions", "array")
        );
    }

    #[test]
    /// typed and value decoding agree on the same ledger
    fn test_irregular_ledger_matches_typed() {
        let regular = r#"{"ledger_index": "77", "transactions": [
            {"TransactionType": "Payment", "Memos": [{"Memo": {"MemoData": "ff"}}]},
            {"Account": "r9"}
        ]}"#;
        // a duplicated key sends the record down the value walk
        let irregular = r#"{"ledger_index": "76", "ledger_index": "77", "transactions": [
            {"TransactionType": "Payment", "Memos": [{"Memo": {"MemoData": "ff"}}]},
            {"Account": "r9"}
        ]}"#;
        assert_eq!(parse(regular).unwrap(), parse(irregular).unwrap());
        assert_eq!(parse_irregular(regular.as_bytes()).unwrap(), parse(regular).unwrap());
    }

    #[test]
    fn test_non_object_ledger() {
        assert_eq!(
            parse("[1, 2]").unwrap_err(),
            ParseError::mismatch("block", "object")
        );
        assert!(matches!(
            parse(r#"{"ledger_index": 1, "transactions": ["#).unwrap_err(),
            ParseError::MalformedJson(_)
        ));
    }

    #[test]
    fn test_reparse_is_equal() {
        let raw = br#"{"ledger_index": "9", "transactions": [{"TransactionType": "TrustSet"}]}"#;
        assert_eq!(Xrp.parse_block(raw).unwrap(), Xrp.parse_block(raw).unwrap());
    }
}
