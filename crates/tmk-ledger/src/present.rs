//! Display formatting for ledger outputs.

use crate::fixedpoint::{div_round, Micros, Percent, Qty};

/// `$1,234.50` / `-$3.00`. Rounded to cents, half away from zero.
pub fn format_currency(amount: Micros) -> String {
    let cents = div_round(amount.raw() as i128, 10_000);
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}${}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// `+50.00%` / `-12.50%` / `0.00%`.
pub fn format_percent(p: Percent) -> String {
    let hundredths = div_round(p.raw() as i128, 10_000);
    let sign = match hundredths.signum() {
        1 => "+",
        -1 => "-",
        _ => "",
    };
    let h = hundredths.unsigned_abs();
    format!("{sign}{}.{:02}%", h / 100, h % 100)
}

/// Quantity with trailing zeros trimmed (`2.5`, `3`).
pub fn format_qty(q: Qty) -> String {
    q.to_string()
}

fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
