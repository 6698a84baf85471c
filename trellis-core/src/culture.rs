//! Culture information used by scalar conversion.
//!
//! Conversion never consults ambient state: every value provider result
//! carries the culture it was produced under, and conversion takes it as an
//! explicit argument.

use std::fmt;

/// Number and date formatting conventions for a culture
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Culture {
    name: String,
    decimal_separator: char,
    group_separator: char,
    /// chrono format string for short dates
    short_date_format: &'static str,
}

impl Culture {
    /// The invariant culture: `.` decimal separator, `,` group separator
    pub fn invariant() -> Self {
        Self {
            name: String::new(),
            decimal_separator: '.',
            group_separator: ',',
            short_date_format: "%m/%d/%Y",
        }
    }

    /// Look up a culture by name (`en-US`, `de-DE`, ...).
    ///
    /// Unknown names fall back to invariant conventions but keep the name.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or("");
        let (decimal_separator, group_separator, short_date_format) = match primary {
            "" => return Self::invariant(),
            "en" if lower == "en-gb" => ('.', ',', "%d/%m/%Y"),
            "en" => ('.', ',', "%m/%d/%Y"),
            "de" | "nl" | "da" | "id" | "tr" => (',', '.', "%d.%m.%Y"),
            "fr" | "ru" | "pl" | "cs" | "sv" | "nb" | "fi" => (',', '\u{a0}', "%d/%m/%Y"),
            "es" | "it" | "pt" => (',', '.', "%d/%m/%Y"),
            "ja" | "zh" | "ko" => ('.', ',', "%Y/%m/%d"),
            _ => ('.', ',', "%m/%d/%Y"),
        };
        Self {
            name: name.to_string(),
            decimal_separator,
            group_separator,
            short_date_format,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_invariant(&self) -> bool {
        self.name.is_empty()
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    pub fn group_separator(&self) -> char {
        self.group_separator
    }

    pub fn short_date_format(&self) -> &'static str {
        self.short_date_format
    }

    /// Rewrite a culture-formatted number into the invariant form that
    /// `str::parse` understands. Group separators are removed only when
    /// `allow_grouping` is set.
    pub(crate) fn normalize_number(&self, input: &str, allow_grouping: bool) -> Option<String> {
        let mut out = String::with_capacity(input.len());
        let mut seen_decimal = false;
        for c in input.trim().chars() {
            if c == self.decimal_separator && !seen_decimal {
                seen_decimal = true;
                out.push('.');
            } else if c == self.group_separator
                || (self.group_separator == '\u{a0}' && c == ' ')
            {
                if !allow_grouping || seen_decimal {
                    return None;
                }
            } else {
                out.push(c);
            }
        }
        Some(out)
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invariant() {
            write!(f, "(invariant)")
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant() {
        let c = Culture::invariant();
        assert!(c.is_invariant());
        assert_eq!(c.decimal_separator(), '.');
        assert_eq!(c.to_string(), "(invariant)");
    }

    #[test]
    fn test_german_numbers() {
        let de = Culture::from_name("de-DE");
        assert_eq!(de.decimal_separator(), ',');
        assert_eq!(de.normalize_number("1.234,5", true).as_deref(), Some("1234.5"));
        assert_eq!(de.normalize_number("1.234,5", false), None);
    }

    #[test]
    fn test_grouping_after_decimal_rejected() {
        let en = Culture::from_name("en-US");
        assert_eq!(en.normalize_number("1,000.25", true).as_deref(), Some("1000.25"));
        assert_eq!(en.normalize_number("1.000,25", true), None);
    }
}
