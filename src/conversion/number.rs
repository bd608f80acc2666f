use std::fmt;

/// Returns true if `input` is a plain numeric string: optional surrounding
/// whitespace, an optional sign, digits with an optional decimal point and an
/// optional exponent. Hexadecimal and other notations are rejected.
pub fn is_numeric(input: &str) -> bool {
    let s = input.trim();
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_digits = count_digits(&bytes[i..]);
    i += int_digits;

    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = count_digits(&bytes[i..]);
        i += frac_digits;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_digits = count_digits(&bytes[i..]);
        if exp_digits == 0 {
            return false;
        }
        i += exp_digits;
    }

    i == bytes.len()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Formats a float the shortest way that round-trips, without a trailing
/// `.0` on whole numbers.
pub fn format_float(value: f64) -> String {
    format!("{}", value)
}

/// Parses numeric input for the decimal converter's `marshal` step.
///
/// Only parsers that report `supports_locale_parsing` may be used once locale
/// parsing is switched on.
pub trait NumberParser: Send + Sync + fmt::Debug {
    fn supports_locale_parsing(&self) -> bool;

    /// Parses `input` into a float, returning `None` when it is not a number.
    fn parse_float(&self, input: &str) -> Option<f64>;
}

/// Parser that only understands the plain `1234.5` notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainNumberParser;

impl NumberParser for PlainNumberParser {
    fn supports_locale_parsing(&self) -> bool {
        false
    }

    fn parse_float(&self, input: &str) -> Option<f64> {
        if is_numeric(input) {
            input.trim().parse().ok()
        } else {
            None
        }
    }
}

/// Locale aware parser driven by a decimal and a grouping separator.
#[derive(Debug, Clone, Copy)]
pub struct LocaleNumberParser {
    decimal_separator: char,
    group_separator: char,
}

impl LocaleNumberParser {
    pub fn new(decimal_separator: char, group_separator: char) -> Self {
        Self {
            decimal_separator,
            group_separator,
        }
    }

    /// `1,234.5`
    pub fn en_us() -> Self {
        Self::new('.', ',')
    }

    /// `1.234,5`
    pub fn de_de() -> Self {
        Self::new(',', '.')
    }
}

impl Default for LocaleNumberParser {
    fn default() -> Self {
        Self::en_us()
    }
}

impl NumberParser for LocaleNumberParser {
    fn supports_locale_parsing(&self) -> bool {
        true
    }

    fn parse_float(&self, input: &str) -> Option<f64> {
        let normalized: String = input
            .trim()
            .chars()
            .filter(|c| *c != self.group_separator && !c.is_whitespace())
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();

        if is_numeric(&normalized) {
            normalized.parse().ok()
        } else {
            None
        }
    }
}
