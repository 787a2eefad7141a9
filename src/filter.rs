//! Per-column filter expressions as typed into a grid header.
//!
//! `<3`, `>= 10`, `=Idle`, `1..5`, `!tomcat` or a plain substring.

use std::cmp::Ordering;

use crate::votable::CellValue;
use crate::votable::row::parse_decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
}

impl Operator {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Operator::Less => ordering == Ordering::Less,
            Operator::LessOrEqual => ordering != Ordering::Greater,
            Operator::Greater => ordering == Ordering::Greater,
            Operator::GreaterOrEqual => ordering != Ordering::Less,
            Operator::Equal => ordering == Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Any,
    Compare(Operator, String),
    /// Inclusive, either end may be open.
    Range(Option<String>, Option<String>),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueFilter {
    expression: String,
    negated: bool,
    condition: Condition,
}

impl ValueFilter {
    pub fn parse(expression: &str) -> Self {
        let trimmed = expression.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        let condition = if body.is_empty() {
            Condition::Any
        } else if let Some((operator, operand)) = Self::split_operator(body) {
            Condition::Compare(operator, operand.trim().to_string())
        } else if let Some((low, high)) = body.split_once("..") {
            let bound = |s: &str| Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string);
            Condition::Range(bound(low), bound(high))
        } else {
            Condition::Contains(body.to_lowercase())
        };

        Self {
            expression: expression.to_string(),
            negated: negated && condition != Condition::Any,
            condition,
        }
    }

    fn split_operator(body: &str) -> Option<(Operator, &str)> {
        // Two character operators first
        [
            (">=", Operator::GreaterOrEqual),
            ("<=", Operator::LessOrEqual),
            (">", Operator::Greater),
            ("<", Operator::Less),
            ("=", Operator::Equal),
        ]
        .into_iter()
        .find_map(|(token, operator)| body.strip_prefix(token).map(|rest| (operator, rest)))
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn is_blank(&self) -> bool {
        self.condition == Condition::Any
    }

    pub fn matches(&self, value: &CellValue) -> bool {
        let matched = match &self.condition {
            Condition::Any => return true,
            Condition::Compare(operator, operand) => {
                Self::compare(value, operand).is_some_and(|o| operator.accepts(o))
            }
            Condition::Range(low, high) => {
                let above = low.as_ref().is_none_or(|low| {
                    Self::compare(value, low).is_some_and(|o| o != Ordering::Less)
                });
                let below = high.as_ref().is_none_or(|high| {
                    Self::compare(value, high).is_some_and(|o| o != Ordering::Greater)
                });
                above && below
            }
            Condition::Contains(term) => value.to_string().to_lowercase().contains(term),
        };
        matched != self.negated
    }

    /// Order `value` against `operand`: numerically when both are numbers,
    /// as strings otherwise. `None` when the value is NaN.
    fn compare(value: &CellValue, operand: &str) -> Option<Ordering> {
        let number = match value {
            CellValue::Text(s) => parse_decimal(s),
            numeric => Some(numeric.as_f64()),
        };
        match (number, parse_decimal(operand)) {
            (Some(x), _) if x.is_nan() => None,
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(value.to_string().as_str().cmp(operand)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn blank_matches_everything() {
        let filter = ValueFilter::parse("  ");
        assert!(filter.is_blank());
        assert!(filter.matches(&text("anything")));
        assert!(filter.matches(&CellValue::nan()));
        assert!(ValueFilter::parse("!").matches(&text("x")));
    }

    #[test]
    fn numeric_comparisons() {
        let filter = ValueFilter::parse("< 3");
        assert_eq!(filter.condition(), &Condition::Compare(Operator::Less, "3".into()));
        assert!(filter.matches(&CellValue::Integer(2)));
        assert!(!filter.matches(&CellValue::Integer(3)));
        assert!(!filter.matches(&CellValue::nan()));
        assert!(filter.matches(&text("-3.59")));

        assert!(ValueFilter::parse(">=3").matches(&CellValue::Integer(3)));
        assert!(ValueFilter::parse("<=9.76").matches(&CellValue::Float(9.76)));
        assert!(ValueFilter::parse(">41").matches(&CellValue::Float(47.1)));
        assert!(ValueFilter::parse("=3072").matches(&CellValue::Integer(3072)));
        // 10 > 9 numerically, but "10" < "9" as strings
        assert!(ValueFilter::parse(">9").matches(&text("10")));
    }

    #[test]
    fn string_comparisons() {
        assert!(ValueFilter::parse("=Idle").matches(&text("Idle")));
        assert!(!ValueFilter::parse("=Idle").matches(&text("idle")));
        assert!(ValueFilter::parse(">m").matches(&text("there")));
        assert!(!ValueFilter::parse(">m").matches(&text("hello")));
    }

    #[test]
    fn special_float_words_are_text() {
        assert!(ValueFilter::parse("=NaN").matches(&text("NaN")));
        assert!(ValueFilter::parse("=inf").matches(&text("inf")));
        assert!(!ValueFilter::parse("=inf").matches(&text("infinity")));
        assert!(ValueFilter::parse("<inf").matches(&text("abc")));
    }

    #[test]
    fn ranges() {
        let filter = ValueFilter::parse("1..2");
        assert!(filter.matches(&CellValue::Integer(1)));
        assert!(filter.matches(&CellValue::Integer(2)));
        assert!(!filter.matches(&CellValue::Integer(3)));
        assert!(!filter.matches(&CellValue::nan()));
        assert!(ValueFilter::parse("..0").matches(&CellValue::Float(-3.59)));
        assert!(ValueFilter::parse("40..").matches(&CellValue::Float(41.0)));
    }

    #[test]
    fn substring_and_negation() {
        assert!(ValueFilter::parse("TOM").matches(&text("Tomcat")));
        assert!(!ValueFilter::parse("!tom").matches(&text("Tomcat")));
        assert!(ValueFilter::parse("!tom").matches(&text("sleep")));
        assert!(ValueFilter::parse("!<3").matches(&CellValue::nan()));
        assert!(ValueFilter::parse("66.10").matches(&text("2011.03.66.10.N")));
    }
}
