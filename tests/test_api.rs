//!
//! Integration Test
//!
//! Run the analyzer against archive fixtures. Cross checking results between APIs.
//!
#[cfg(test)]
mod analyzer_tests {
    use bc_data_analyzer::{
        compute_block_numbers, count_actions, count_actions_with, get_missing_block_numbers,
        missing_block_numbers, open_reader, par_compute_block_numbers, Blockchain, BlockReader,
        Cancellation, OpErrorKind, ParseError, RawBlock, Tezos, Xrp,
    };
    use std::collections::BTreeSet;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::PathBuf;
    use tempdir::TempDir;

    const XRP_LEDGERS: &str = "xrp_ledgers.ndjson";
    const XRP_MISSING_LEDGERS: &str = "xrp_missing_ledgers.ndjson";
    const XRP_MALFORMED: &str = "xrp_malformed.ndjson";
    const TEZOS_BLOCKS: &str = "tezos_blocks.ndjson";
    const EMPTY: &str = "empty.ndjson";

    /// utility function
    fn fixture(name: &str) -> PathBuf {
        let mut crate_root_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_root_dir.push("resources/tests");
        crate_root_dir.push(name);
        crate_root_dir
    }

    fn raw_blocks(name: &str) -> Vec<RawBlock> {
        BlockReader::open(fixture(name))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    /// 100 contiguous ledgers
    fn test_compute_block_numbers() {
        let mut reader = open_reader(fixture(XRP_LEDGERS)).unwrap();
        let numbers = compute_block_numbers(&mut reader, &Xrp).unwrap();
        assert_eq!(numbers.len(), 100);
        assert!(numbers.contains(&54387329));
        assert!(reader.is_closed());
    }

    #[test]
    fn test_get_missing_block_numbers_valid() {
        let mut reader = open_reader(fixture(XRP_LEDGERS)).unwrap();
        let missing = get_missing_block_numbers(&mut reader, &Xrp).unwrap();
        assert!(missing.is_empty());
        assert!(reader.is_closed());
    }

    #[test]
    fn test_get_missing_block_numbers_invalid() {
        let mut reader = open_reader(fixture(XRP_MISSING_LEDGERS)).unwrap();
        let missing = get_missing_block_numbers(&mut reader, &Xrp).unwrap();
        assert_eq!(missing, vec![124]);
    }

    #[test]
    /// block numbers follow the records, one by one
    fn test_order_preserved() {
        let blocks = raw_blocks(XRP_MISSING_LEDGERS);
        let expected: Vec<u64> = blocks
            .iter()
            .map(|raw| Xrp.parse_block(&raw.data).unwrap().number())
            .collect();

        let mut reader = open_reader(fixture(XRP_MISSING_LEDGERS)).unwrap();
        let numbers = compute_block_numbers(&mut reader, &Xrp).unwrap();
        assert_eq!(numbers.len(), blocks.len());
        assert_eq!(numbers, expected);
    }

    #[test]
    /// missing = [min, max] \ present
    fn test_missing_set_law() {
        let mut reader = open_reader(fixture(XRP_MISSING_LEDGERS)).unwrap();
        let numbers = compute_block_numbers(&mut reader, &Xrp).unwrap();
        let present: BTreeSet<u64> = numbers.iter().copied().collect();
        let lo = *present.iter().next().unwrap();
        let hi = *present.iter().next_back().unwrap();
        let expected: Vec<u64> = (lo..=hi).filter(|n| !present.contains(n)).collect();
        assert_eq!(missing_block_numbers(&numbers), expected);
    }

    #[test]
    fn test_tezos_parse_block() {
        let blocks = raw_blocks(TEZOS_BLOCKS);
        let block = Tezos.parse_block(&blocks[0].data).unwrap();
        assert_eq!(block.number(), 10000);
        assert_eq!(block.transactions_count(), 8);
    }

    #[test]
    fn test_tezos_actions_count() {
        let blocks = raw_blocks(TEZOS_BLOCKS);
        let block = Tezos.parse_block(&blocks[1].data).unwrap();
        assert_eq!(block.actions_count().get("endorsement"), 8);
        assert_eq!(block.actions_count().get("delegation"), 1);
    }

    #[test]
    /// tezos: one action per content, xrp: one action per transaction
    fn test_actions_cover_contents() {
        for raw in raw_blocks(TEZOS_BLOCKS) {
            let block = Tezos.parse_block(&raw.data).unwrap();
            let json: serde_json::Value = serde_json::from_slice(&raw.data).unwrap();
            let contents: usize = json["operations"]
                .as_array()
                .unwrap()
                .iter()
                .flat_map(|pass| pass.as_array().unwrap())
                .map(|group| group["contents"].as_array().unwrap().len())
                .sum();
            assert_eq!(block.actions_count().total(), contents as u64);
            assert!(block.actions_count().total() >= block.transactions_count());
        }
        for raw in raw_blocks(XRP_LEDGERS) {
            let block = Xrp.parse_block(&raw.data).unwrap();
            assert_eq!(block.actions_count().total(), block.transactions_count());
        }
    }

    #[test]
    fn test_reparse_is_idempotent() {
        for raw in raw_blocks(TEZOS_BLOCKS) {
            assert_eq!(
                Tezos.parse_block(&raw.data).unwrap(),
                Tezos.parse_block(&raw.data).unwrap()
            );
        }
    }

    #[test]
    /// truncated JSON on line 7
    fn test_malformed_record() {
        let mut reader = open_reader(fixture(XRP_MALFORMED)).unwrap();
        let err = compute_block_numbers(&mut reader, &Xrp).unwrap_err();
        assert!(matches!(
            err.kind(),
            OpErrorKind::ParseError(ParseError::MalformedJson(_))
        ));
        assert_eq!(err.line(), Some(7));
        assert_eq!(err.path(), Some(fixture(XRP_MALFORMED).as_path()));
        assert!(reader.is_closed());
    }

    #[test]
    fn test_empty_archive() {
        let mut reader = open_reader(fixture(EMPTY)).unwrap();
        assert!(compute_block_numbers(&mut reader, &Xrp).unwrap().is_empty());
        let mut reader = open_reader(fixture(EMPTY)).unwrap();
        assert!(get_missing_block_numbers(&mut reader, &Tezos)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_wrong_chain_fails() {
        let mut reader = open_reader(fixture(TEZOS_BLOCKS)).unwrap();
        let err = compute_block_numbers(&mut reader, &Xrp).unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::MissingField("ledger_index".to_owned()))
        );
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    #[cfg(feature = "gzip")]
    /// gzipped archive gives the same result as the plain one
    fn test_gzip_archive() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = TempDir::new("archives").unwrap();
        let path = dir.path().join("xrp_ledgers.ndjson.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::fast());
        encoder
            .write_all(&fs::read(fixture(XRP_LEDGERS)).unwrap())
            .unwrap();
        encoder.finish().unwrap();

        let mut plain = open_reader(fixture(XRP_LEDGERS)).unwrap();
        let mut gzipped = open_reader(&path).unwrap();
        assert_eq!(
            compute_block_numbers(&mut gzipped, &Xrp).unwrap(),
            compute_block_numbers(&mut plain, &Xrp).unwrap()
        );
    }

    #[test]
    #[cfg(feature = "gzip")]
    /// the header decodes at open, the stream breaks while reading
    fn test_truncated_gzip_archive() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for index in 0..20_000u64 {
            writeln!(
                encoder,
                r#"{{"ledger_index": "{}", "transactions": [{{"TransactionType": "Payment"}}]}}"#,
                60_000_000 + index
            )
            .unwrap();
        }
        let compressed = encoder.finish().unwrap();

        let dir = TempDir::new("archives").unwrap();
        let path = dir.path().join("truncated.ndjson.gz");
        File::create(&path)
            .unwrap()
            .write_all(&compressed[..compressed.len() / 2])
            .unwrap();

        let mut reader = open_reader(&path).unwrap();
        let err = compute_block_numbers(&mut reader, &Xrp).unwrap_err();
        assert!(matches!(err.kind(), OpErrorKind::FormatError));
        assert!(err.line().is_some());
        assert_eq!(err.path(), Some(path.as_path()));
        assert!(reader.is_closed());
    }

    #[test]
    #[cfg(feature = "gzip")]
    /// a damaged member body fails in stream order, before or at the CRC check
    fn test_damaged_gzip_member() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&fs::read(fixture(XRP_LEDGERS)).unwrap())
            .unwrap();
        let mut compressed = encoder.finish().unwrap();
        let middle = compressed.len() / 2;
        compressed[middle] ^= 0xff;

        let dir = TempDir::new("archives").unwrap();
        let path = dir.path().join("damaged.ndjson.gz");
        File::create(&path).unwrap().write_all(&compressed).unwrap();

        let mut reader = open_reader(&path).unwrap();
        let err = compute_block_numbers(&mut reader, &Xrp).unwrap_err();
        assert!(matches!(
            err.kind(),
            OpErrorKind::FormatError | OpErrorKind::ParseError(_)
        ));
        assert!(err.line().is_some());
        assert!(reader.is_closed());
    }

    #[test]
    fn test_corrupt_gzip_archive() {
        let dir = TempDir::new("archives").unwrap();
        let path = dir.path().join("broken.ndjson.gz");
        File::create(&path)
            .unwrap()
            .write_all(&fs::read(fixture(XRP_LEDGERS)).unwrap())
            .unwrap();
        let err = open_reader(&path).unwrap_err();
        assert!(matches!(err.kind(), OpErrorKind::FormatError));
    }

    #[test]
    fn test_par_compute_block_numbers() {
        let mut reader = open_reader(fixture(XRP_MISSING_LEDGERS)).unwrap();
        let sequential = compute_block_numbers(&mut reader, &Xrp).unwrap();
        let reader = open_reader(fixture(XRP_MISSING_LEDGERS)).unwrap();
        let parallel = par_compute_block_numbers(reader, Xrp, &Cancellation::new()).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_par_compute_malformed() {
        let reader = open_reader(fixture(XRP_MALFORMED)).unwrap();
        let err = par_compute_block_numbers(reader, Xrp, &Cancellation::new()).unwrap_err();
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn test_par_compute_cancelled() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let reader = open_reader(fixture(XRP_LEDGERS)).unwrap();
        let err = par_compute_block_numbers(reader, Xrp, &cancel).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.path(), Some(fixture(XRP_LEDGERS).as_path()));
        // nothing was handed out yet
        assert_eq!(err.line(), Some(0));
    }

    #[test]
    fn test_count_actions_cancelled() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let mut reader = open_reader(fixture(TEZOS_BLOCKS)).unwrap();
        let err = count_actions_with(&mut reader, &Tezos, &cancel).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.line(), Some(0));
        assert!(reader.is_closed());
    }

    #[test]
    fn test_count_actions() {
        let mut reader = open_reader(fixture(TEZOS_BLOCKS)).unwrap();
        let actions = count_actions(&mut reader, &Tezos).unwrap();

        let mut expected = 0;
        for raw in raw_blocks(TEZOS_BLOCKS) {
            expected += Tezos.parse_block(&raw.data).unwrap().actions_count().get("endorsement");
        }
        assert_eq!(actions.get("endorsement"), expected);
        assert_eq!(actions.get("delegation"), 1);
        let labels: Vec<String> = actions.entries().into_iter().map(|(l, _)| l).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }
}
