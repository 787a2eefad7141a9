use std::collections::BTreeMap;

use tracing::trace;

use super::{Cell, CellValue, Field, Row};

/// Longest string length seen per field id. `None` until a non-empty value
/// has been recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongestValues(BTreeMap<String, Option<usize>>);

impl LongestValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the field shows up even if all its values are empty.
    pub fn register(&mut self, field_id: &str) {
        self.0.entry(field_id.to_string()).or_insert(None);
    }

    pub fn record(&mut self, field_id: &str, value: &str) {
        let length = (!value.is_empty()).then(|| value.chars().count());
        let longest = self.0.entry(field_id.to_string()).or_insert(None);
        if length > *longest {
            *longest = length;
        }
    }

    pub fn get(&self, field_id: &str) -> Option<usize> {
        self.0.get(field_id).copied().flatten()
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<usize>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Builds rows out of raw cell data. Every reader funnels through here so
/// that datatype conversion is the same for all input formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct RowBuilder;

impl RowBuilder {
    pub fn new() -> Self {
        RowBuilder
    }

    /// Build a row from `row_data`, pairing the i-th item with the i-th field.
    /// Surplus items or fields are ignored.
    pub fn build_row_data<T>(
        &self,
        fields: &[Field],
        row_id: impl Into<String>,
        row_data: &[T],
        longest_values: &mut LongestValues,
        extract: impl Fn(&T) -> String,
    ) -> Row {
        let cells = fields
            .iter()
            .zip(row_data.iter())
            .map(|(field, data)| {
                let string_value = extract(data);
                longest_values.record(&field.id, &string_value);
                Cell::new(Self::convert(field, string_value), field)
            })
            .collect::<Vec<Cell>>();

        let row = Row::new(row_id, cells);
        trace!("Built row {} with {} cells", row.id, row.cells.len());
        row
    }

    fn convert(field: &Field, value: String) -> CellValue {
        match &field.datatype {
            Some(datatype) if datatype.is_numeric() => {
                if value.trim().is_empty() {
                    CellValue::nan()
                } else if datatype.is_floating_point_numeric() {
                    CellValue::Float(parse_float(&value))
                } else {
                    parse_integer(&value)
                }
            }
            _ => CellValue::Text(value),
        }
    }
}

/// Length of the longest numeric prefix of `s` (sign, digits, fraction and
/// optionally an exponent).
fn numeric_prefix_len(s: &str, allow_fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        pos += 1;
    }
    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut digits = pos - int_start;
    if !allow_fraction {
        return if digits > 0 { pos } else { 0 };
    }

    if pos < bytes.len() && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        digits += end - frac_start;
        pos = end;
    }
    if digits == 0 {
        return 0;
    }

    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        let mut end = pos + 1;
        if matches!(bytes.get(end), Some(b'+') | Some(b'-')) {
            end += 1;
        }
        let exp_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > exp_start {
            pos = end;
        }
    }
    pos
}

/// Lenient float parsing: leading whitespace is skipped and trailing garbage
/// ignored. Returns NaN when there is no number at the start.
pub fn parse_float(value: &str) -> f64 {
    let s = value.trim_start();
    for (literal, v) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if s.starts_with(literal) {
            return v;
        }
    }
    let len = numeric_prefix_len(s, true);
    if len == 0 {
        return f64::NAN;
    }
    s[..len].parse().unwrap_or(f64::NAN)
}

/// Strict decimal parsing: the whole trimmed value must be a number in
/// plain or exponent notation. `inf` and `NaN` are not numbers here.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let s = value.trim();
    let len = numeric_prefix_len(s, true);
    if len == 0 || len != s.len() {
        return None;
    }
    s.parse().ok()
}

/// Lenient integer parsing with the same rules as [`parse_float`]. Values
/// outside the i64 range are kept as floats.
pub fn parse_integer(value: &str) -> CellValue {
    let s = value.trim_start();
    let len = numeric_prefix_len(s, false);
    if len == 0 {
        return CellValue::nan();
    }
    match s[..len].parse::<i64>() {
        Ok(i) => CellValue::Integer(i),
        Err(_) => CellValue::Float(s[..len].parse().unwrap_or(f64::NAN)),
    }
}
