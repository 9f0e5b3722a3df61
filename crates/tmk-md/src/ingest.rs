//! History files into [`TxRecord`]s.
//!
//! ## CSV column contract (case-insensitive, order-independent)
//!
//! | Column      | Example                | Notes                              |
//! |-------------|------------------------|------------------------------------|
//! | `asset_id`  | `pokemon-base-charizard` |                                  |
//! | `type`      | `buy` / `sell`         | Other tags are kept and skipped at replay |
//! | `quantity`  | `2.5`                  | Kept raw; replay applies coercion  |
//! | `price`     | `350.00`               | Kept raw                           |
//! | `timestamp` | `2024-03-01T12:00:00Z` | RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or epoch seconds |
//!
//! Structural problems (unreadable file, missing column, bad timestamp) are
//! errors. Numeric fields are never judged here.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tmk_ledger::{RawDecimal, TxKind, TxRecord};

#[derive(Debug)]
pub enum IngestError {
    Io(String),
    MissingHeader(String),
    ParseField {
        row: usize,
        field: &'static str,
        raw: String,
    },
    Json(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(msg) => write!(f, "history io error: {msg}"),
            IngestError::MissingHeader(col) => {
                write!(f, "csv missing required header column: '{col}'")
            }
            IngestError::ParseField { row, field, raw } => {
                write!(f, "csv row {row}: cannot parse field '{field}' from value '{raw}'")
            }
            IngestError::Json(msg) => write!(f, "history json error: {msg}"),
        }
    }
}

impl std::error::Error for IngestError {}

const REQUIRED: [&str; 5] = ["asset_id", "type", "quantity", "price", "timestamp"];

/// Read a history file; `.json` is parsed as a JSON array, anything else as
/// CSV.
pub fn parse_history_file(path: &Path) -> Result<Vec<TxRecord>, IngestError> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| IngestError::Io(format!("read '{}': {e}", path.display())))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        parse_history_json_str(&src)
    } else {
        parse_history_csv_str(&src)
    }
}

pub fn parse_history_json_str(src: &str) -> Result<Vec<TxRecord>, IngestError> {
    serde_json::from_str(src).map_err(|e| IngestError::Json(e.to_string()))
}

pub fn parse_history_csv_str(src: &str) -> Result<Vec<TxRecord>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(src.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| IngestError::Io(e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let idx: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_ascii_lowercase(), i))
        .collect();
    for req in REQUIRED {
        if !idx.contains_key(req) {
            return Err(IngestError::MissingHeader(req.to_string()));
        }
    }
    let col = |name: &str| idx.get(name).copied().unwrap_or(usize::MAX);

    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        // header is row 1
        let row = i + 2;
        let rec = rec.map_err(|e| IngestError::Io(format!("csv row {row}: {e}")))?;
        if rec.iter().all(str::is_empty) {
            continue;
        }
        let get = |name: &str| rec.get(col(name)).unwrap_or("");

        let ts_raw = get("timestamp");
        let timestamp = parse_timestamp(ts_raw).ok_or_else(|| IngestError::ParseField {
            row,
            field: "timestamp",
            raw: ts_raw.to_string(),
        })?;

        let raw = |name: &str| {
            let v = get(name);
            (!v.is_empty()).then(|| RawDecimal(v.to_string()))
        };

        out.push(TxRecord {
            asset_id: get("asset_id").to_string(),
            kind: TxKind::from(get("type").to_string()),
            quantity: raw("quantity"),
            price: raw("price"),
            timestamp,
        });
    }
    Ok(out)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` read as UTC, or integer epoch seconds.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    s.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "asset_id,type,quantity,price,timestamp";

    #[test]
    fn header_only_returns_empty_vec() {
        assert!(parse_history_csv_str(HEADER).unwrap().is_empty());
        assert!(parse_history_csv_str("").unwrap().is_empty());
    }

    #[test]
    fn columns_are_case_insensitive_and_unordered() {
        let src = "Timestamp,PRICE,Type,Quantity,Asset_ID\n2024-01-01T00:00:00Z,10.5,Buy,2,gold\n";
        let recs = parse_history_csv_str(src).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].asset_id, "gold");
        assert_eq!(recs[0].kind, TxKind::Buy);
        assert_eq!(recs[0].price, Some(RawDecimal("10.5".to_string())));
    }

    #[test]
    fn missing_required_header_returns_err() {
        let err = parse_history_csv_str("asset_id,type,quantity,timestamp\n").unwrap_err();
        assert!(matches!(err, IngestError::MissingHeader(c) if c == "price"));
    }

    #[test]
    fn bad_timestamp_is_structural() {
        let src = format!("{HEADER}\ngold,buy,1,10,yesterday\n");
        let err = parse_history_csv_str(&src).unwrap_err();
        assert!(matches!(err, IngestError::ParseField { row: 2, field: "timestamp", .. }));
    }

    #[test]
    fn numeric_fields_stay_raw() {
        let src = format!("{HEADER}\ngold,buy,abc,,1700000000\n");
        let recs = parse_history_csv_str(&src).unwrap();
        assert_eq!(recs[0].quantity, Some(RawDecimal("abc".to_string())));
        assert_eq!(recs[0].price, None);
        assert_eq!(recs[0].timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn timestamp_formats() {
        let a = parse_timestamp("2024-03-01T12:00:00Z").unwrap();
        let b = parse_timestamp("2024-03-01 12:00:00").unwrap();
        let c = parse_timestamp("2024-03-01T13:00:00+01:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_timestamp("03/01/2024").is_none());
    }
}
