use chrono::{DateTime, TimeZone, Utc};
use tmk_ledger::{
    build_ledger, CoercionPolicy, FifoLedger, HistoryError, LedgerBook, Micros, Percent, Qty,
    ReplayOptions, TxRecord,
};

fn t(n: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + n * 60, 0).unwrap()
}

fn history() -> Vec<TxRecord> {
    // Deliberately unordered and mixed across assets.
    vec![
        TxRecord::sell("gold-bar", "2", "15", t(3)),
        TxRecord::buy("silver-coin", "10", "1.25", t(0)),
        TxRecord::buy("gold-bar", "3", "20", t(2)),
        TxRecord::buy("gold-bar", "2", "10", t(1)),
        TxRecord::sell("silver-coin", "4", "1.5", t(4)),
    ]
}

#[test]
fn scenario_replay_matches_direct_recording() {
    let replay = build_ledger("gold-bar", &history(), ReplayOptions::default()).unwrap();

    let mut direct = FifoLedger::new();
    direct.record_purchase(Qty::from_units(2), Micros::from_tokens(10), t(1)).unwrap();
    direct.record_purchase(Qty::from_units(3), Micros::from_tokens(20), t(2)).unwrap();
    direct.record_sale(Qty::from_units(2), Micros::from_tokens(15), t(3)).unwrap();

    assert_eq!(replay.ledger.summary(), direct.summary());
    assert_eq!(replay.ledger.lots(), direct.lots());
    assert_eq!(replay.report.coerced, 0);
}

#[test]
fn scenario_replay_is_deterministic() {
    let a = build_ledger("silver-coin", &history(), ReplayOptions::default()).unwrap();
    let mut reversed = history();
    reversed.reverse();
    let b = build_ledger("silver-coin", &reversed, ReplayOptions::default()).unwrap();

    assert_eq!(a.ledger.summary(), b.ledger.summary());
    assert_eq!(a.ledger.summary().total_gain_loss, Micros::from_tokens(1));
    assert_eq!(a.ledger.open_quantity(), Qty::from_units(6));
}

#[test]
fn scenario_strict_replay_fails_where_lenient_coerces() {
    let mut recs = history();
    recs.push(TxRecord::buy("gold-bar", "lots", "20", t(5)));

    let lenient = build_ledger("gold-bar", &recs, ReplayOptions::default()).unwrap();
    assert_eq!(lenient.report.coerced, 1);
    assert_eq!(lenient.ledger.open_quantity(), Qty::from_units(4));

    let strict = ReplayOptions {
        coercion: CoercionPolicy::Strict,
        ..ReplayOptions::default()
    };
    let err = build_ledger("gold-bar", &recs, strict).unwrap_err();
    assert!(matches!(
        err,
        HistoryError::MalformedRecord { index: 5, field: "quantity", .. }
    ));
}

#[test]
fn scenario_book_rebuilds_every_asset() {
    let (book, reports) = LedgerBook::from_history(&history(), ReplayOptions::default()).unwrap();
    assert_eq!(book.len(), 2);
    assert_eq!(reports["gold-bar"].purchases, 2);
    assert_eq!(reports["silver-coin"].sales, 1);
    for asset in book.assets() {
        assert!(book.get(asset).unwrap().verify_integrity());
    }
}

#[test]
fn scenario_excess_precision_is_rounded_not_coerced() {
    // The store delivers prices as JSON floats with seven decimals.
    let json = r#"[
        {"asset_id":"gold-bar","type":"buy","quantity":1,"price":10.1234567,"timestamp":"2024-01-01T00:00:00Z"},
        {"asset_id":"gold-bar","type":"sell","quantity":"1","price":"12","timestamp":"2024-01-02T00:00:00Z"}
    ]"#;
    let recs: Vec<TxRecord> = serde_json::from_str(json).unwrap();

    for coercion in [CoercionPolicy::Lenient, CoercionPolicy::Strict] {
        let opts = ReplayOptions {
            coercion,
            ..ReplayOptions::default()
        };
        let r = build_ledger("gold-bar", &recs, opts).unwrap();
        assert_eq!(r.report.coerced, 0);

        let s = r.ledger.summary();
        assert_eq!(s.cost_basis, Micros::new(10_123_457));
        assert_eq!(s.total_gain_loss, Micros::new(1_876_543));
        assert_eq!(s.percent_change, Percent::new(18_536_583));
    }
}
