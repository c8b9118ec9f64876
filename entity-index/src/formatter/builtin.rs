use std::fmt::Write;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use crate::formatter::{Formatter, FormatterOptions};
use crate::metadata::FieldValue;

const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";
const DEFAULT_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";
const ISO_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders text as-is, numbers via `Display`, booleans as `"1"`/`""`, dates as
/// ISO-8601 and lists space-joined.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl Formatter for DefaultFormatter {
    fn configure(&mut self, _options: &FormatterOptions) {}

    fn render(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Float(n) => n.to_string(),
            FieldValue::Boolean(true) => "1".to_string(),
            FieldValue::Boolean(false) => String::new(),
            FieldValue::Date(date) => date.to_string(),
            FieldValue::DateTime(datetime) => datetime.format(ISO_DATETIME_FORMAT).to_string(),
            FieldValue::List(items) => join_rendered(items, |item| self.render(item)),
        }
    }
}

/// Renders dates and timestamps with a strftime `format` option.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    default_format: &'static str,
    format: String,
}

impl DateFormatter {
    /// Dates as `%d.%m.%Y` unless configured otherwise.
    pub fn date() -> Self {
        Self {
            default_format: DEFAULT_DATE_FORMAT,
            format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Timestamps as `%d.%m.%Y %H:%M` unless configured otherwise.
    pub fn datetime() -> Self {
        Self {
            default_format: DEFAULT_DATETIME_FORMAT,
            format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }

    fn format_date(&self, date: &NaiveDate) -> String {
        let mut out = String::new();
        // Time specifiers cannot be applied to a plain date.
        match write!(out, "{}", date.format(&self.format)) {
            Ok(()) => out,
            Err(_) => date.to_string(),
        }
    }
}

impl Formatter for DateFormatter {
    fn configure(&mut self, options: &FormatterOptions) {
        self.format = match options.get("format") {
            Some(Value::String(format)) if is_valid_strftime(format) => format.clone(),
            Some(other) => {
                warn!(format = %other, "Invalid date format option, using default");
                self.default_format.to_string()
            }
            None => self.default_format.to_string(),
        };
    }

    fn render(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Date(date) => self.format_date(date),
            FieldValue::DateTime(datetime) => {
                let mut out = String::new();
                match write!(out, "{}", datetime.format(&self.format)) {
                    Ok(()) => out,
                    Err(_) => datetime.format(ISO_DATETIME_FORMAT).to_string(),
                }
            }
            FieldValue::List(items) => join_rendered(items, |item| self.render(item)),
            other => DefaultFormatter.render(other),
        }
    }
}

fn is_valid_strftime(format: &str) -> bool {
    use chrono::format::{Item, StrftimeItems};

    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Renders booleans with configurable labels.
#[derive(Debug, Clone)]
pub struct BooleanFormatter {
    true_label: String,
    false_label: String,
}

impl Default for BooleanFormatter {
    fn default() -> Self {
        Self {
            true_label: "yes".to_string(),
            false_label: "no".to_string(),
        }
    }
}

impl Formatter for BooleanFormatter {
    fn configure(&mut self, options: &FormatterOptions) {
        let defaults = Self::default();
        self.true_label = string_option(options, "true_label").unwrap_or(defaults.true_label);
        self.false_label = string_option(options, "false_label").unwrap_or(defaults.false_label);
    }

    fn render(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Boolean(true) => self.true_label.clone(),
            FieldValue::Boolean(false) => self.false_label.clone(),
            other => DefaultFormatter.render(other),
        }
    }
}

/// Renders numbers, with a fixed number of `decimals` when configured.
#[derive(Debug, Clone, Default)]
pub struct NumberFormatter {
    decimals: Option<usize>,
}

impl Formatter for NumberFormatter {
    fn configure(&mut self, options: &FormatterOptions) {
        self.decimals = options
            .get("decimals")
            .and_then(Value::as_u64)
            .and_then(|d| usize::try_from(d).ok());
    }

    fn render(&self, value: &FieldValue) -> String {
        match (value, self.decimals) {
            (FieldValue::Integer(n), Some(decimals)) => format!("{:.*}", decimals, *n as f64),
            (FieldValue::Float(n), Some(decimals)) => format!("{:.*}", decimals, n),
            (FieldValue::List(items), _) => join_rendered(items, |item| self.render(item)),
            (other, _) => DefaultFormatter.render(other),
        }
    }
}

fn string_option(options: &FormatterOptions, key: &str) -> Option<String> {
    options.get(key).and_then(Value::as_str).map(str::to_string)
}

fn join_rendered(items: &[FieldValue], render: impl Fn(&FieldValue) -> String) -> String {
    items
        .iter()
        .map(render)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn options(value: Value) -> FormatterOptions {
        match value {
            Value::Object(map) => map,
            _ => FormatterOptions::new(),
        }
    }

    #[test]
    fn test_default_formatter() {
        let f = DefaultFormatter;
        assert_eq!(f.render(&FieldValue::Null), "");
        assert_eq!(f.render(&"Mauricio SA".into()), "Mauricio SA");
        assert_eq!(f.render(&42_i64.into()), "42");
        assert_eq!(f.render(&1.5_f64.into()), "1.5");
        assert_eq!(f.render(&true.into()), "1");
        assert_eq!(f.render(&false.into()), "");
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert_eq!(f.render(&date.into()), "2020-03-01");
        let list: FieldValue = vec!["a", "", "b"].into();
        assert_eq!(f.render(&list), "a b");
        assert_eq!(f.render(&Option::<String>::None.into()), "");
    }

    #[test]
    fn test_date_formatter_options() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let mut f = DateFormatter::date();
        assert_eq!(f.render(&date.into()), "01.03.2020");

        f.configure(&options(json!({ "format": "%Y/%m" })));
        assert_eq!(f.render(&date.into()), "2020/03");

        // Reconfiguring without options restores the default.
        f.configure(&FormatterOptions::new());
        assert_eq!(f.render(&date.into()), "01.03.2020");

        f.configure(&options(json!({ "format": "%Q" })));
        assert_eq!(f.render(&date.into()), "01.03.2020");
    }

    #[test]
    fn test_date_formatter_never_panics_on_time_specifiers() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let mut f = DateFormatter::date();
        f.configure(&options(json!({ "format": "%H:%M" })));
        assert_eq!(f.render(&date.into()), "2020-03-01");
    }

    #[test]
    fn test_datetime_formatter() {
        let at = Utc.with_ymd_and_hms(2021, 12, 24, 18, 30, 0).unwrap();
        let f = DateFormatter::datetime();
        assert_eq!(f.render(&at.into()), "24.12.2021 18:30");
        assert_eq!(f.render(&FieldValue::Null), "");
    }

    #[test]
    fn test_boolean_formatter() {
        let mut f = BooleanFormatter::default();
        assert_eq!(f.render(&true.into()), "yes");
        assert_eq!(f.render(&false.into()), "no");

        f.configure(&options(json!({ "true_label": "active" })));
        assert_eq!(f.render(&true.into()), "active");
        assert_eq!(f.render(&false.into()), "no");
    }

    #[test]
    fn test_number_formatter() {
        let mut f = NumberFormatter::default();
        assert_eq!(f.render(&3_i64.into()), "3");

        f.configure(&options(json!({ "decimals": 2 })));
        assert_eq!(f.render(&3_i64.into()), "3.00");
        assert_eq!(f.render(&2.5_f64.into()), "2.50");
        assert_eq!(f.render(&"n/a".into()), "n/a");
    }
}
