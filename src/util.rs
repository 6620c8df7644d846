pub fn format_usd(amount: f64) -> String {
    const UNITS: [&str; 4] = ["", "K", "M", "B"];

    if !amount.is_finite() {
        return "$0".to_owned();
    }

    // Units step on the rounded value so 999.6 reads "$1.0K", not "$1000".
    let mut value = amount.abs();
    let mut unit = 0usize;
    loop {
        let precision = if unit == 0 { 1.0 } else { 10.0 };
        let rounded = (value * precision).round() / precision;
        if rounded < 1000.0 || unit == UNITS.len() - 1 {
            value = rounded;
            break;
        }
        value /= 1000.0;
        unit += 1;
    }
    let sign = if amount < 0.0 && value > 0.0 { "-" } else { "" };

    if unit == 0 {
        format!("{sign}${value:.0}")
    } else {
        format!("{sign}${value:.1}{}", UNITS[unit])
    }
}

/// Shortens hex wallet addresses to `0x1234…abcd`. Other ids are returned
/// unchanged.
pub fn short_id(id: &str) -> String {
    let is_hex_address = id.len() > 14
        && id.starts_with("0x")
        && id[2..].chars().all(|ch| ch.is_ascii_hexdigit());
    if is_hex_address {
        format!("{}…{}", &id[..6], &id[id.len() - 4..])
    } else {
        id.to_owned()
    }
}
