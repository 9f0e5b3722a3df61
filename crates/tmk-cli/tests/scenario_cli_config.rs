use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn config_hash_prints_hash_and_canonical_json() {
    let base = yaml_file("ledger:\n  oversell_policy: clip\n");
    let over = yaml_file("ledger:\n  oversell_policy: reject\n");

    Command::cargo_bin("tmk")
        .unwrap()
        .env("RUST_LOG", "error")
        .args([
            "config-hash",
            base.path().to_str().unwrap(),
            over.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_match("config_hash=[0-9a-f]{64}").unwrap())
        .stdout(predicate::str::contains(r#"{"ledger":{"oversell_policy":"reject"}}"#));
}

#[test]
fn config_ledger_policy_applies_to_gains() {
    let cfg = yaml_file("ledger:\n  oversell_policy: reject\n");
    let mut hist = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    hist.write_all(
        b"asset_id,type,quantity,price,timestamp\n\
          a,buy,1,10,2024-01-01T00:00:00Z\n\
          a,sell,2,12,2024-01-02T00:00:00Z\n",
    )
    .unwrap();
    hist.flush().unwrap();

    Command::cargo_bin("tmk")
        .unwrap()
        .env("RUST_LOG", "error")
        .args([
            "gains",
            "--history",
            hist.path().to_str().unwrap(),
            "--config",
            cfg.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient lots"));
}

#[test]
fn price_uses_static_oracle_and_fallback() {
    let cfg = yaml_file(
        r#"
assets:
  - id: "house"
    oracle: "static"
    fallback_price: "12.5"
  - id: "charizard"
    table: "charizard_prices"
    fallback_price: "350"
"#,
    );

    Command::cargo_bin("tmk")
        .unwrap()
        .env("RUST_LOG", "error")
        .args(["price", "--config", cfg.path().to_str().unwrap(), "--asset", "house"])
        .assert()
        .success()
        .stdout(predicate::str::contains("price=$12.50"))
        .stdout(predicate::str::contains("source=oracle"));

    Command::cargo_bin("tmk")
        .unwrap()
        .env("RUST_LOG", "error")
        .args(["price", "--config", cfg.path().to_str().unwrap(), "--asset", "charizard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("price=$350.00"))
        .stdout(predicate::str::contains("source=fallback"));
}

#[test]
fn price_unknown_asset_fails() {
    let cfg = yaml_file("assets: []\n");
    Command::cargo_bin("tmk")
        .unwrap()
        .env("RUST_LOG", "error")
        .args(["price", "--config", cfg.path().to_str().unwrap(), "--asset", "mew"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown asset 'mew'"));
}

#[test]
fn unknown_policy_name_is_rejected() {
    let cfg = yaml_file("ledger:\n  coercion_policy: sloppy\n");
    let mut hist = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    hist.write_all(b"asset_id,type,quantity,price,timestamp\n").unwrap();
    hist.flush().unwrap();

    Command::cargo_bin("tmk")
        .unwrap()
        .env("RUST_LOG", "error")
        .args([
            "gains",
            "--history",
            hist.path().to_str().unwrap(),
            "--config",
            cfg.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid /ledger section"))
        .stderr(predicate::str::contains(
            "invalid coercion policy 'sloppy'. expected one of: lenient | strict",
        ));
}
