// src/parsing/loaders.rs

//! Tag-aware YAML decoding.
//!
//! Spec files may use YAML tags as value constructors, e.g.:
//!
//! ```yaml
//! start_date: !days_ago 7
//! execution_timeout: !timedelta 'minutes: 5'
//! end_date: !datetime [2024, 1, 2]
//! ```
//!
//! [`TagDecoder`] parses a document and replaces every tagged node with the
//! output of the constructor registered for that tag. Three constructors are
//! built in (`days_ago`, `timedelta`, `datetime`); callers can register their
//! own on top of those.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Number, Value};

use crate::errors::{AssemblyError, Result};
use crate::types::SpecMap;

/// User-supplied value constructor for a YAML tag.
///
/// Receives the already-decoded inner value (nested tags are resolved
/// first) and returns the replacement value, or a message describing why
/// the input is unusable.
pub type TagConstructor =
    Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Decodes YAML text and resolves tagged values through registered
/// constructors.
///
/// Unknown tags are an error: a tag is a request for a constructor, and a
/// silently ignored one would leave a raw tagged node in the spec where
/// callers expect a plain value.
#[derive(Clone)]
pub struct TagDecoder {
    constructors: BTreeMap<String, TagConstructor>,
}

impl TagDecoder {
    /// Decoder with the built-in constructors only.
    pub fn new() -> Self {
        let mut decoder = Self {
            constructors: BTreeMap::new(),
        };
        decoder.register("days_ago", Arc::new(days_ago_tag));
        decoder.register("timedelta", Arc::new(timedelta_tag));
        decoder.register("datetime", Arc::new(datetime_tag));
        decoder
    }

    /// Register a constructor for `!name`.
    ///
    /// Re-registering a name replaces the previous constructor, so callers
    /// can override the built-ins.
    pub fn register(&mut self, name: impl Into<String>, constructor: TagConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Parse `text` and resolve all tags. `origin` is only used in error
    /// messages.
    pub fn decode_str(&self, text: &str, origin: &Path) -> Result<Value> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|err| AssemblyError::DecodeError {
                path: origin.to_path_buf(),
                message: err.to_string(),
            })?;
        self.resolve(value, origin)
    }

    /// Parse `text` into a flat spec record.
    ///
    /// The document must be a mapping with string keys; an empty document
    /// decodes to an empty record.
    pub fn decode_map(&self, text: &str, origin: &Path) -> Result<SpecMap> {
        let value = self.decode_str(text, origin)?;
        map_from_value(value, origin)
    }

    fn resolve(&self, value: Value, origin: &Path) -> Result<Value> {
        match value {
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                let name = tag.to_string();
                let name = name.trim_start_matches('!');
                let constructor =
                    self.constructors
                        .get(name)
                        .ok_or_else(|| AssemblyError::DecodeError {
                            path: origin.to_path_buf(),
                            message: format!("unknown tag '!{name}'"),
                        })?;
                let inner = self.resolve(value, origin)?;
                constructor(&inner).map_err(|message| AssemblyError::DecodeError {
                    path: origin.to_path_buf(),
                    message: format!("tag '!{name}': {message}"),
                })
            }
            Value::Sequence(seq) => {
                let resolved = seq
                    .into_iter()
                    .map(|item| self.resolve(item, origin))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Sequence(resolved))
            }
            Value::Mapping(map) => {
                let mut out = Mapping::new();
                for (key, val) in map {
                    out.insert(self.resolve(key, origin)?, self.resolve(val, origin)?);
                }
                Ok(Value::Mapping(out))
            }
            other => Ok(other),
        }
    }
}

impl Default for TagDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TagDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDecoder")
            .field("tags", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Convert a decoded top-level value into a [`SpecMap`].
pub(crate) fn map_from_value(value: Value, origin: &Path) -> Result<SpecMap> {
    match value {
        Value::Null => Ok(SpecMap::new()),
        Value::Mapping(map) => {
            let mut out = SpecMap::new();
            for (key, val) in map {
                let key = key
                    .as_str()
                    .ok_or_else(|| AssemblyError::DecodeError {
                        path: origin.to_path_buf(),
                        message: format!("mapping key is not a string: {key:?}"),
                    })?
                    .to_string();
                out.insert(key, val);
            }
            Ok(out)
        }
        other => Err(AssemblyError::DecodeError {
            path: origin.to_path_buf(),
            message: format!("expected a mapping at the top level, got {}", kind_name(&other)),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// `!days_ago N` → the calendar date N days before today (UTC), as
/// `YYYY-MM-DD`.
fn days_ago_tag(value: &Value) -> std::result::Result<Value, String> {
    let n = value
        .as_u64()
        .ok_or_else(|| format!("expects a non-negative integer, got {}", kind_name(value)))?;
    let date = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(n))
        .ok_or_else(|| format!("{n} days is out of calendar range"))?;
    Ok(Value::String(date.format("%Y-%m-%d").to_string()))
}

/// `!timedelta ...` → a duration in whole seconds.
///
/// Accepts a bare integer (seconds), a `'unit: amount'` string, or a
/// mapping of units (`weeks`, `days`, `hours`, `minutes`, `seconds`).
fn timedelta_tag(value: &Value) -> std::result::Result<Value, String> {
    let seconds = match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| "expects whole seconds".to_string())?,
        Value::String(s) => {
            let (unit, amount) = s
                .split_once(':')
                .ok_or_else(|| format!("cannot parse '{s}' as 'unit: amount'"))?;
            let amount: i64 = amount
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a whole number", amount.trim()))?;
            unit_total(unit.trim(), amount)?
        }
        Value::Mapping(map) => {
            let mut total = 0i64;
            for (key, val) in map {
                let unit = key
                    .as_str()
                    .ok_or_else(|| format!("unit name is not a string: {key:?}"))?;
                let amount = val
                    .as_i64()
                    .ok_or_else(|| format!("'{unit}' amount must be a whole number"))?;
                total = total
                    .checked_add(unit_total(unit, amount)?)
                    .ok_or_else(|| "duration total is out of range".to_string())?;
            }
            total
        }
        other => {
            return Err(format!(
                "expects seconds, a 'unit: amount' string or a unit mapping, got {}",
                kind_name(other)
            ));
        }
    };
    Ok(Value::Number(Number::from(seconds)))
}

fn unit_seconds(unit: &str) -> std::result::Result<i64, String> {
    match unit {
        "weeks" => Ok(604_800),
        "days" => Ok(86_400),
        "hours" => Ok(3_600),
        "minutes" => Ok(60),
        "seconds" => Ok(1),
        other => Err(format!("unknown time unit '{other}'")),
    }
}

fn unit_total(unit: &str, amount: i64) -> std::result::Result<i64, String> {
    unit_seconds(unit)?
        .checked_mul(amount)
        .ok_or_else(|| format!("'{unit}: {amount}' is out of range"))
}

/// `!datetime ...` → an RFC 3339 timestamp string (UTC).
///
/// Accepts a date or datetime string, a `[year, month, day, hour, minute,
/// second]` sequence (time parts optional), or a mapping with those field
/// names.
fn datetime_tag(value: &Value) -> std::result::Result<Value, String> {
    let dt = match value {
        Value::String(s) => parse_datetime_str(s)?,
        Value::Sequence(seq) => {
            let parts = seq
                .iter()
                .map(|item| {
                    item.as_i64()
                        .ok_or_else(|| format!("expects whole numbers, got {}", kind_name(item)))
                })
                .collect::<std::result::Result<Vec<i64>, String>>()?;
            if !(3..=6).contains(&parts.len()) {
                return Err(format!(
                    "expects [year, month, day] with optional [hour, minute, second], got {} items",
                    parts.len()
                ));
            }
            let part = |i: usize| parts.get(i).copied().unwrap_or(0);
            datetime_from_parts(parts[0], parts[1], parts[2], part(3), part(4), part(5))?
        }
        Value::Mapping(map) => {
            let mut fields: BTreeMap<String, i64> = BTreeMap::new();
            for (key, val) in map {
                let name = key
                    .as_str()
                    .ok_or_else(|| format!("field name is not a string: {key:?}"))?;
                let n = val
                    .as_i64()
                    .ok_or_else(|| format!("'{name}' must be a whole number"))?;
                fields.insert(name.to_string(), n);
            }
            let required = |name: &str| {
                fields
                    .get(name)
                    .copied()
                    .ok_or_else(|| format!("missing field '{name}'"))
            };
            let optional = |name: &str| fields.get(name).copied().unwrap_or(0);
            datetime_from_parts(
                required("year")?,
                required("month")?,
                required("day")?,
                optional("hour"),
                optional("minute"),
                optional("second"),
            )?
        }
        other => {
            return Err(format!(
                "expects a date string, a sequence or a mapping, got {}",
                kind_name(other)
            ));
        }
    };
    Ok(Value::String(dt.and_utc().to_rfc3339()))
}

fn parse_datetime_str(s: &str) -> std::result::Result<NaiveDateTime, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(format!("cannot parse '{s}' as a date or datetime"))
}

fn datetime_from_parts(
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
) -> std::result::Result<NaiveDateTime, String> {
    let year = i32::try_from(year).map_err(|_| format!("year {year} out of range"))?;
    let to_u32 = |name: &str, n: i64| {
        u32::try_from(n).map_err(|_| format!("{name} {n} out of range"))
    };
    let date = NaiveDate::from_ymd_opt(year, to_u32("month", month)?, to_u32("day", day)?)
        .ok_or_else(|| format!("{year:04}-{month:02}-{day:02} is not a calendar date"))?;
    date.and_hms_opt(
        to_u32("hour", hour)?,
        to_u32("minute", minute)?,
        to_u32("second", second)?,
    )
    .ok_or_else(|| format!("{hour:02}:{minute:02}:{second:02} is not a valid time"))
}
