//! Cell-level helpers shared by every sweep over the ledger grid.

pub(crate) fn trim_cell(text: &str) -> String {
    text.trim()
        .trim_start_matches('\u{feff}')
        .trim()
        .to_string()
}

/// Trimmed cell text, or `""` when the row is shorter than `idx`.
pub fn cell_at(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// The row's cells concatenated without separators, used for keyword scans.
pub fn row_text(row: &[String]) -> String {
    row.concat()
}

/// Instrument names are compared with all whitespace removed.
pub fn compact_name(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parses a ledger cell into a non-negative amount.
///
/// Thousands separators and surrounding whitespace are stripped, then the
/// longest numeric prefix is read (`"12.5%"` reads as `12.5`). Empty input,
/// text, non-finite and negative results all read as `0.0`.
pub fn parse_value(cell: Option<&str>) -> f64 {
    let Some(raw) = cell else {
        return 0.0;
    };
    let cleaned = raw.replace(',', "");
    let text = cleaned.trim();
    if text.is_empty() {
        return 0.0;
    }

    let prefix = numeric_prefix(text);
    match prefix.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

pub(crate) fn value_at(row: &[String], idx: usize) -> f64 {
    parse_value(row.get(idx).map(String::as_str))
}

fn numeric_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return "";
    }

    // Optional exponent, only kept when it carries digits.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    &text[..end]
}
