//! Lookup properties of the symbol/key index

use std::collections::BTreeSet;

use market_connector::instruments::{Instrument, InstrumentIndex, InstrumentRecord};
use market_connector::InstrumentError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::*;

#[fixture]
fn banks() -> InstrumentIndex {
    InstrumentIndex::build(vec![
        InstrumentRecord::new("NSE_EQ|INE040A01034", "HDFCBANK", "HDFC Bank", "NSE_EQ"),
        InstrumentRecord::new("NSE_EQ|INE090A01021", "ICICIBANK", "ICICI Bank", "NSE_EQ"),
        InstrumentRecord::new("NSE_EQ|INE062A01020", "SBIN", "State Bank of India", "NSE_EQ"),
        InstrumentRecord::new("NSE_FO|35003", "NIFTY24JAN", "Nifty Jan", "NSE_FO"),
    ])
}

#[test]
fn test_end_to_end_example() {
    let index = InstrumentIndex::build(vec![
        InstrumentRecord::new("INE040A01034", "HDFCBANK", "HDFC Bank", "NSE_EQ"),
        InstrumentRecord::new("NIFTY24JANFUT", "NIFTY24JANFUT", "Nifty Future", "NCD_FO"),
    ]);

    assert_eq!(index.len(), 1);
    assert_eq!(
        index.resolve_by_symbol("HDFCBANK", "NSE_EQ").expect("resolve"),
        Instrument::new("NSE_EQ|HDFCBANK", "INE040A01034")
    );
    assert!(matches!(
        index.resolve_by_symbol("NIFTY24JANFUT", "NCD_FO"),
        Err(InstrumentError::SymbolNotFound(_))
    ));
}

#[rstest]
fn test_complex_symbols_are_not_indexed(banks: InstrumentIndex) {
    assert!(!banks.contains_symbol("NIFTY24JAN", "NSE_FO"));
    assert!(!banks.contains_key("NSE_FO|35003"));
    assert!(banks.contains_symbol("HDFCBANK", "NSE_EQ"));
    assert_eq!(banks.stats().complex, 1);
}

#[rstest]
fn test_batch_symbols_in_order(banks: InstrumentIndex) {
    let resolved = banks
        .resolve_by_symbols(&["HDFCBANK", "ICICIBANK"], "NSE_EQ")
        .expect("both resolve");

    assert_eq!(
        resolved,
        vec![
            Instrument::new("NSE_EQ|HDFCBANK", "NSE_EQ|INE040A01034"),
            Instrument::new("NSE_EQ|ICICIBANK", "NSE_EQ|INE090A01021"),
        ]
    );
}

#[rstest]
fn test_batch_symbols_fail_fast(banks: InstrumentIndex) {
    let err = banks
        .resolve_by_symbols(&["HDFCBANK", "NOTREAL", "ALSONOTREAL"], "NSE_EQ")
        .expect_err("NOTREAL is unknown");

    assert_eq!(err.to_string(), "Invalid symbol: NSE_EQ|NOTREAL");
}

#[rstest]
fn test_missing_symbol(banks: InstrumentIndex) {
    let err = banks.resolve_by_symbol("MISSING", "NSE_EQ").expect_err("missing");
    assert!(err.is_not_found());
}

#[rstest]
fn test_symbol_is_scoped_by_exchange(banks: InstrumentIndex) {
    assert!(banks.resolve_by_symbol("HDFCBANK", "BSE_EQ").is_err());
}

#[rstest]
fn test_batch_keys(banks: InstrumentIndex) {
    let resolved = banks
        .resolve_by_keys(&["nse_eq|ine062a01020", "NSE_EQ|INE040A01034"])
        .expect("both resolve");

    assert_eq!(resolved[0], Instrument::new("NSE_EQ|SBIN", "NSE_EQ|INE062A01020"));
    assert_eq!(resolved[1].trading_symbol, "NSE_EQ|HDFCBANK");
}

fn listing() -> impl Strategy<Value = BTreeSet<String>> {
    proptest::collection::btree_set("[A-Z][A-Z&-]{0,10}", 1..40)
}

fn index_for(symbols: &BTreeSet<String>) -> InstrumentIndex {
    InstrumentIndex::build(symbols.iter().enumerate().map(|(i, symbol)| {
        InstrumentRecord::new(format!("NSE_EQ|INE{i:06}A01"), symbol.clone(), "", "NSE_EQ")
    }))
}

proptest! {
    #[test]
    fn prop_symbol_key_round_trip(symbols in listing()) {
        let index = index_for(&symbols);
        prop_assert!(index.is_consistent());

        for symbol in &symbols {
            let forward = index.resolve_by_symbol(symbol, "NSE_EQ").expect("indexed symbol");
            let back = index.resolve_by_key(&forward.instrument_key).expect("indexed key");

            prop_assert_eq!(&back.trading_symbol, &forward.trading_symbol);
            prop_assert_eq!(&back.instrument_key, &forward.instrument_key);
        }
    }

    #[test]
    fn prop_lookups_ignore_case_and_padding(symbols in listing()) {
        let index = index_for(&symbols);

        for symbol in &symbols {
            let exact = index.resolve_by_symbol(symbol, "NSE_EQ").expect("exact");
            let loose = index
                .resolve_by_symbol(&format!("  {}  ", symbol.to_lowercase()), " nse_eq ")
                .expect("loose");
            prop_assert_eq!(&exact, &loose);

            let by_key = index
                .resolve_by_key(&format!(" {} ", exact.instrument_key.to_lowercase()))
                .expect("loose key");
            prop_assert_eq!(&by_key.instrument_key, &exact.instrument_key);
        }
    }

    #[test]
    fn prop_alphanumeric_contract_symbols_are_dropped(
        root in "[A-Z]{2,8}",
        expiry in "[0-9]{2}[A-Z]{3}",
    ) {
        let contract = format!("{root}{expiry}");
        let index = InstrumentIndex::build(vec![
            InstrumentRecord::new("KEY-1", contract.clone(), "", "NSE_FO"),
            InstrumentRecord::new("KEY-2", root.clone(), "", "NSE_FO"),
        ]);

        prop_assert!(!index.contains_symbol(&contract, "NSE_FO"));
        prop_assert!(index.contains_symbol(&root, "NSE_FO"));
    }
}
