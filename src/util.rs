use std::fmt::Display;

/// String helper for values that end up in grid cells and headers.
#[derive(Debug, Clone)]
pub struct StringUtil {
    value: String,
}

impl StringUtil {
    pub fn new(value: impl Display) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    /// Escape markup characters so the value is safe to place in HTML.
    pub fn sanitize(&self) -> String {
        self.value
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    pub fn has_text(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// Replace `{0}`, `{1}`, ... with the matching argument.
    pub fn format(&self, args: &[&dyn Display]) -> String {
        args.iter()
            .enumerate()
            .fold(self.value.clone(), |acc, (i, arg)| {
                acc.replace(&format!("{{{i}}}"), &arg.to_string())
            })
    }
}

/// Number formatting with the conventions of the grid's numeric columns.
#[derive(Debug, Clone, Copy)]
pub struct NumberFormat {
    value: f64,
    precision: usize,
}

impl NumberFormat {
    pub fn new(value: f64, precision: usize) -> Self {
        Self { value, precision }
    }

    /// Fixed notation with `precision` decimals.
    pub fn format_fixation(&self) -> String {
        if !self.value.is_finite() {
            return Self::non_finite(self.value);
        }
        format!("{:.*}", self.precision, self.value)
    }

    /// `precision` significant digits, switching to exponential notation for
    /// very small or very large values.
    pub fn format_precision(&self) -> String {
        if !self.value.is_finite() {
            return Self::non_finite(self.value);
        }
        let digits = self.precision.max(1);
        if self.value == 0.0 {
            return format!("{:.*}", digits - 1, 0.0);
        }

        let exponent = Self::rounded_exponent(self.value, digits - 1);
        if exponent < -6 || exponent >= digits as i32 {
            Self::exponential(self.value, digits - 1)
        } else {
            let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
            format!("{:.*}", decimals, self.value)
        }
    }

    /// Exponential notation when the decimal exponent exceeds the precision,
    /// fixed notation otherwise.
    pub fn format_exponent_or_float(&self) -> String {
        if !self.value.is_finite() {
            return Self::non_finite(self.value);
        }
        let exponent = if self.value == 0.0 {
            0
        } else {
            self.value.abs().log10().floor() as i32
        };

        if exponent > self.precision as i32 {
            Self::exponential(self.value, self.precision)
        } else {
            self.format_fixation()
        }
    }

    fn rounded_exponent(value: f64, decimals: usize) -> i32 {
        let formatted = format!("{:.*e}", decimals, value);
        formatted
            .split_once('e')
            .and_then(|(_, exp)| exp.parse().ok())
            .unwrap_or(0)
    }

    // Rust writes `5.4843e11`, the grid expects `5.4843e+11`.
    fn exponential(value: f64, decimals: usize) -> String {
        let formatted = format!("{:.*e}", decimals, value);
        match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{}", exp.abs())
            }
            None => formatted,
        }
    }

    fn non_finite(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    }
}
