//! String to scalar conversion.
//!
//! Every conversion takes the [`Culture`] of the value provider that produced
//! the text. The output is the JSON form of the converted value so that it
//! can be stored in a dynamic model and later deserialized into the target
//! Rust type.

use crate::culture::Culture;
use crate::model_type::{ModelType, ScalarKind, TypeShape};
use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};
use thiserror::Error;

/// A value could not be converted to the requested scalar kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' cannot be converted to {target}")]
pub struct ConversionError {
    pub value: String,
    pub target: String,
}

impl ConversionError {
    fn new(value: &str, kind: ScalarKind) -> Self {
        Self {
            value: value.to_string(),
            target: format!("{:?}", kind),
        }
    }
}

/// Convert `raw` into the JSON form of `kind` using `culture`
pub fn convert_scalar(
    kind: ScalarKind,
    raw: &str,
    culture: &Culture,
) -> Result<Value, ConversionError> {
    let fail = || ConversionError::new(raw, kind);
    let text = raw.trim();

    match kind {
        ScalarKind::String => Ok(Value::String(raw.to_string())),
        ScalarKind::Bool => {
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(fail())
            }
        }
        ScalarKind::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::String(c.to_string())),
                _ => Err(fail()),
            }
        }
        ScalarKind::I8 => signed(text, i8::MIN as i128, i8::MAX as i128).ok_or_else(fail),
        ScalarKind::I16 => signed(text, i16::MIN as i128, i16::MAX as i128).ok_or_else(fail),
        ScalarKind::I32 => signed(text, i32::MIN as i128, i32::MAX as i128).ok_or_else(fail),
        ScalarKind::I64 | ScalarKind::Isize | ScalarKind::I128 => {
            signed(text, i64::MIN as i128, i64::MAX as i128).ok_or_else(fail)
        }
        ScalarKind::U8 => unsigned(text, u8::MAX as u128).ok_or_else(fail),
        ScalarKind::U16 => unsigned(text, u16::MAX as u128).ok_or_else(fail),
        ScalarKind::U32 => unsigned(text, u32::MAX as u128).ok_or_else(fail),
        ScalarKind::U64 | ScalarKind::Usize | ScalarKind::U128 => {
            unsigned(text, u64::MAX as u128).ok_or_else(fail)
        }
        ScalarKind::F32 | ScalarKind::F64 => {
            let normalized = culture.normalize_number(text, true).ok_or_else(fail)?;
            let parsed: f64 = normalized.parse().map_err(|_| fail())?;
            if kind == ScalarKind::F32 && parsed.is_finite() && parsed.abs() > f32::MAX as f64 {
                return Err(fail());
            }
            Number::from_f64(parsed).map(Value::Number).ok_or_else(fail)
        }
        ScalarKind::Uuid => uuid::Uuid::parse_str(text)
            .map(|u| Value::String(u.to_string()))
            .map_err(|_| fail()),
        ScalarKind::DateTime => parse_date_time(text, culture)
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .ok_or_else(fail),
        ScalarKind::Date => parse_date(text, culture)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(fail),
        ScalarKind::Enum(variants) => {
            if let Some(name) = variants.iter().find(|v| v.eq_ignore_ascii_case(text)) {
                return Ok(Value::String(name.to_string()));
            }
            text.parse::<usize>()
                .ok()
                .and_then(|index| variants.get(index))
                .map(|name| Value::String(name.to_string()))
                .ok_or_else(fail)
        }
    }
}

/// Convert `raw` into the JSON form of `model_type`, looking through `Option`.
///
/// Only scalar shapes convert; anything else is a conversion failure.
pub fn convert_to(
    model_type: &ModelType,
    raw: &str,
    culture: &Culture,
) -> Result<Value, ConversionError> {
    match model_type.shape() {
        TypeShape::Scalar(kind) => convert_scalar(*kind, raw, culture),
        TypeShape::Nullable(inner) => {
            if raw.trim().is_empty() {
                Ok(Value::Null)
            } else {
                convert_to(&inner(), raw, culture)
            }
        }
        _ => Err(ConversionError {
            value: raw.to_string(),
            target: model_type.short_name().to_string(),
        }),
    }
}

fn signed(text: &str, min: i128, max: i128) -> Option<Value> {
    let value: i128 = text.strip_prefix('+').unwrap_or(text).parse().ok()?;
    if value < min || value > max {
        return None;
    }
    i64::try_from(value).ok().map(Value::from)
}

fn unsigned(text: &str, max: u128) -> Option<Value> {
    let value: u128 = text.strip_prefix('+').unwrap_or(text).parse().ok()?;
    if value > max {
        return None;
    }
    u64::try_from(value).ok().map(Value::from)
}

fn parse_date_time(text: &str, culture: &Culture) -> Option<chrono::DateTime<Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    parse_date(text, culture)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_date(text: &str, culture: &Culture) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, culture.short_date_format()))
        .ok()
}
