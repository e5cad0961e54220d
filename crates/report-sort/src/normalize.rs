//! Value normalization for cell content.
//!
//! Raw cell text is turned into a canonical string before comparison:
//! line breaks and non-breaking spaces become plain spaces, everything is
//! lower-cased and trimmed, then type-specific stripping applies.

use crate::model::ValueType;

/// Currency symbols removed from number values.
const CURRENCY_SYMBOLS: &[char] = &[
    '$', '\u{20ac}', '\u{a3}', '\u{a5}', '\u{a2}', '\u{20b9}', '\u{20a9}', '\u{20bd}', '\u{20ba}',
    '\u{20ab}', '\u{20aa}',
];

/// Separator between the values of a column with several data markers.
pub const MULTI_VALUE_SEPARATOR: &str = ", ";

/// Normalize one raw value for the given type.
///
/// ```
/// use report_sort::{normalize, ValueType};
///
/// assert_eq!(normalize("  Jane&nbsp;Doe\n", &ValueType::Text), "janedoe");
/// assert_eq!(normalize("$1,200.50", &ValueType::Number), "1200.50");
/// ```
pub fn normalize(raw: &str, value_type: &ValueType) -> String {
    let value = collapse_breaks(raw).to_lowercase();
    let value = value.trim();

    match value_type {
        ValueType::Text => value.chars().filter(|c| !c.is_whitespace()).collect(),
        ValueType::Number => value
            .chars()
            .filter(|c| *c != ',' && *c != '%' && !CURRENCY_SYMBOLS.contains(c))
            .collect(),
        ValueType::Date(_) => value.to_string(),
    }
}

/// Normalize every value of a column and derive the column's effective type.
///
/// A single value keeps its declared type. Zero or several values make the
/// column text, with the values joined by [`MULTI_VALUE_SEPARATOR`].
pub fn normalize_column(values: &[(String, ValueType)]) -> (String, ValueType) {
    match values {
        [] => (String::new(), ValueType::Text),
        [(raw, value_type)] => (normalize(raw, value_type), value_type.clone()),
        many => {
            let joined = many
                .iter()
                .map(|(raw, value_type)| normalize(raw, value_type))
                .collect::<Vec<_>>()
                .join(MULTI_VALUE_SEPARATOR);
            (joined, ValueType::Text)
        }
    }
}

/// Replace line breaks and non-breaking spaces with plain spaces.
fn collapse_breaks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if let Some(len) = break_token_len(rest) {
            out.push(' ');
            rest = &rest[len..];
            continue;
        }
        out.push(if c == '\u{a0}' { ' ' } else { c });
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Length of a line-break or nbsp token at the start of `s`, if any.
fn break_token_len(s: &str) -> Option<usize> {
    const TOKENS: &[&str] = &["\r\n", "\n", "\r", "&nbsp;", "nbsp;", "<br/>", "<br />", "<br>"];
    TOKENS.iter().find_map(|token| {
        s.get(..token.len())
            .filter(|head| head.eq_ignore_ascii_case(token))
            .map(|_| token.len())
    })
}

/// Parse the leading floating point number of `s`.
///
/// Leading whitespace is skipped and any trailing text after the number is
/// ignored, so `"45abc"` is 45. Returns `None` when no number starts the
/// string.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}
