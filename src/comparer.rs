use std::cmp::Ordering;

use crate::votable::{CellValue, Row};

/// Orders rows by the value of one column.
///
/// Numeric columns hold NaN for empty or unparseable cells; those order
/// below every number, including zero, and equal to each other.
#[derive(Debug, Clone)]
pub struct Comparer {
    sort_column: String,
    is_numeric: bool,
}

impl Comparer {
    pub fn new(sort_column: impl Into<String>, is_numeric: bool) -> Self {
        Self {
            sort_column: sort_column.into(),
            is_numeric,
        }
    }

    pub fn sort_column(&self) -> &str {
        &self.sort_column
    }

    /// Compare two rows on the sort column. Rows without the column compare
    /// like NaN in numeric mode and like an empty string otherwise.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        self.compare_values(a.value(&self.sort_column), b.value(&self.sort_column))
    }

    pub fn compare_values(&self, a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
        if self.is_numeric {
            let x = a.map_or(f64::NAN, CellValue::as_f64);
            let y = b.map_or(f64::NAN, CellValue::as_f64);
            Self::nan_compare(x, y)
        } else {
            match (a, b) {
                (Some(a), Some(b)) => Self::content_compare(a, b),
                (None, None) => Ordering::Equal,
                (None, Some(b)) => Self::content_compare(&CellValue::Text(String::new()), b),
                (Some(a), None) => Self::content_compare(a, &CellValue::Text(String::new())),
            }
        }
    }

    fn nan_compare(x: f64, y: f64) -> Ordering {
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        }
    }

    fn content_compare(a: &CellValue, b: &CellValue) -> Ordering {
        match (a, b) {
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                Self::nan_compare(a.as_f64(), b.as_f64())
            }
            (a, b) => a.to_string().cmp(&b.to_string()),
        }
    }
}
