use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tmk_ledger::{
    build_ledger, format_currency, format_percent, format_qty, FifoLedger, LedgerBook, Micros,
    ReplayOptions, ReplayReport, TxRecord,
};

pub struct GainsArgs<'a> {
    pub history: &'a str,
    pub asset: Option<&'a str>,
    pub opts: ReplayOptions,
    pub mark: Option<&'a str>,
    pub json: bool,
}

#[derive(Serialize)]
struct GainsRow {
    asset_id: String,
    open_quantity: String,
    realized_gain_loss: String,
    percent_change: String,
    cost_basis: String,
    proceeds: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unrealized_gain_loss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    market_value: Option<String>,
    purchases: usize,
    sales: usize,
    coerced: usize,
    skipped: usize,
    clipped: String,
}

fn load_history(path: &str) -> Result<Vec<TxRecord>> {
    tmk_md::parse_history_file(Path::new(path))
        .with_context(|| format!("failed to load history: {path}"))
}

fn row(asset_id: &str, ledger: &FifoLedger, report: &ReplayReport, mark: Option<Micros>) -> GainsRow {
    let s = ledger.summary();
    GainsRow {
        asset_id: asset_id.to_string(),
        open_quantity: format_qty(ledger.open_quantity()),
        realized_gain_loss: format_currency(s.total_gain_loss),
        percent_change: format_percent(s.percent_change),
        cost_basis: format_currency(s.cost_basis),
        proceeds: format_currency(s.proceeds),
        unrealized_gain_loss: mark.map(|m| format_currency(ledger.unrealized_gain_loss(m))),
        market_value: mark.map(|m| format_currency(ledger.market_value(m))),
        purchases: report.purchases,
        sales: report.sales,
        coerced: report.coerced,
        skipped: report.skipped,
        clipped: format_qty(report.clipped),
    }
}

pub fn run(args: GainsArgs<'_>) -> Result<()> {
    let records = load_history(args.history)?;
    let mark = args
        .mark
        .map(|m| Micros::parse(m).with_context(|| format!("invalid --mark '{m}'")))
        .transpose()?;

    let rows: Vec<GainsRow> = match args.asset {
        Some(asset) => {
            let replay = build_ledger(asset, &records, args.opts)
                .with_context(|| format!("replay failed for asset '{asset}'"))?;
            vec![row(asset, &replay.ledger, &replay.report, mark)]
        }
        None => {
            let (book, reports): (LedgerBook, BTreeMap<String, ReplayReport>) =
                LedgerBook::from_history(&records, args.opts).context("replay failed")?;
            book.assets()
                .filter_map(|id| Some(row(id, book.get(id)?, reports.get(id)?, None)))
                .collect()
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for r in rows {
        print!(
            "asset={} open_qty={} realized={} percent={} cost_basis={} proceeds={}",
            r.asset_id,
            r.open_quantity,
            r.realized_gain_loss,
            r.percent_change,
            r.cost_basis,
            r.proceeds
        );
        if let (Some(u), Some(v)) = (&r.unrealized_gain_loss, &r.market_value) {
            print!(" unrealized={u} market_value={v}");
        }
        println!(
            " coerced={} skipped={} clipped={}",
            r.coerced, r.skipped, r.clipped
        );
    }
    Ok(())
}

/// `coerced=` counts records whose lots carry default quantity or price.
pub fn lots(history: &str, asset: &str, opts: ReplayOptions) -> Result<()> {
    let records = load_history(history)?;
    let replay = build_ledger(asset, &records, opts)
        .with_context(|| format!("replay failed for asset '{asset}'"))?;

    println!(
        "asset={} open_qty={} coerced={}",
        asset,
        format_qty(replay.ledger.open_quantity()),
        replay.report.coerced
    );
    for lot in replay.ledger.lots() {
        println!(
            "lot acquired_at={} quantity={} unit_price={}",
            lot.timestamp.to_rfc3339(),
            format_qty(lot.quantity),
            format_currency(lot.unit_price)
        );
    }
    Ok(())
}
