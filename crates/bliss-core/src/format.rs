use chrono::DateTime;

const BINARY_UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Human-readable size in binary units, rounded to two decimals with trailing zeros
/// dropped: `2 GiB`, `1.5 KiB`, `512 bytes`.
pub fn format_size(bytes: u64) -> String {
    let mut divider = 1024f64;
    let mut unit = None;
    for symbol in BINARY_UNITS {
        if (bytes as f64) < divider {
            break;
        }
        unit = Some((symbol, divider));
        divider *= 1024.0;
    }
    match unit {
        Some((symbol, divider)) => format!("{} {}", trim_decimal(bytes as f64 / divider), symbol),
        None if bytes == 1 => "1 byte".to_string(),
        None => format!("{bytes} bytes"),
    }
}

/// Calendar date (`dd-mm-yyyy`, UTC) for a unix timestamp in seconds.
pub fn format_date(unix_secs: i64) -> Option<String> {
    DateTime::from_timestamp(unix_secs, 0).map(|dt| dt.format("%d-%m-%Y").to_string())
}

fn trim_decimal(value: f64) -> String {
    let formatted = format!("{value:.2}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
