// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of `key=value` arguments into record fields and list params.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tally_core::{Fields, ListParams};

use crate::error::{Error, Result};

/// Splits `key=value`. The key must be non-empty; the value may be empty.
pub fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    let (key, value) = arg.split_once('=').ok_or_else(|| Error::InvalidField {
        arg: arg.to_string(),
        reason: "missing '='".to_string(),
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidField { arg: arg.to_string(), reason: "empty key".to_string() });
    }
    Ok((key, value))
}

/// Interprets a field value: JSON literals (numbers, booleans, null, arrays,
/// objects, quoted strings) keep their type, anything else is a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Builds a field map from `key=value` arguments. Later keys win.
pub fn parse_fields(args: &[String]) -> Result<Fields> {
    let mut fields = Fields::new();
    for arg in args {
        let (key, value) = split_assignment(arg)?;
        fields.insert(key.to_string(), parse_value(value));
    }
    Ok(fields)
}

/// Builds list params from `key=value` arguments. Values stay strings.
pub fn parse_params(args: &[String]) -> Result<ListParams> {
    let mut params = ListParams::new();
    for arg in args {
        let (key, value) = split_assignment(arg)?;
        params.insert(key, value);
    }
    Ok(params)
}

/// Parses `--data` for `log`: must be JSON.
pub fn parse_data(raw: Option<&str>) -> Result<Value> {
    match raw {
        None => Ok(Value::Null),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}

/// Parses `--at` for `log`: RFC 3339, defaulting to now.
pub fn parse_timestamp(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| Error::InvalidTimestamp { reason: format!("'{raw}': {e}") }),
    }
}

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;
