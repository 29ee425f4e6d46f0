use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::payments::gateway::{GatewayError, GatewayResult};

/// Flat string view of a gateway callback, exactly as the gateway sent each value.
pub type CallbackFields = BTreeMap<String, String>;

pub fn parse_json(raw: &[u8]) -> GatewayResult<CallbackFields> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|err| GatewayError::MalformedPayload(format!("invalid json: {err}")))?;

    let Value::Object(map) = value else {
        return Err(GatewayError::MalformedPayload(
            "notification body is not a json object".to_string(),
        ));
    };

    let fields = map
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key, text))
        })
        .collect();

    Ok(fields)
}

pub fn parse_form(raw: &[u8]) -> GatewayResult<CallbackFields> {
    let fields: CallbackFields = url::form_urlencoded::parse(raw).into_owned().collect();

    if fields.is_empty() {
        return Err(GatewayError::MalformedPayload(
            "empty form notification".to_string(),
        ));
    }

    Ok(fields)
}

/// JSON first, then `application/x-www-form-urlencoded`.
pub fn parse_json_or_form(raw: &[u8]) -> GatewayResult<CallbackFields> {
    match parse_json(raw) {
        Ok(fields) => Ok(fields),
        Err(_) => parse_form(raw),
    }
}

pub fn required<'a>(fields: &'a CallbackFields, key: &str) -> GatewayResult<&'a str> {
    fields
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| GatewayError::MalformedPayload(format!("missing field `{key}`")))
}

pub fn optional(fields: &CallbackFields, key: &str) -> Option<String> {
    fields
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Gateways send amounts as `"10000"`, `"10000.00"` or bare numbers. Fractions are truncated.
pub fn coerce_amount(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(whole) = raw.parse::<i64>() {
        return Some(whole);
    }
    let (whole, fraction) = raw.split_once('.')?;
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    whole.parse::<i64>().ok()
}

const GATEWAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
// Both gateways report wall-clock time in WIB (UTC+7) without an offset.
const GATEWAY_UTC_OFFSET_HOURS: i64 = 7;

pub fn parse_gateway_time(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), GATEWAY_TIME_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&(naive - Duration::hours(GATEWAY_UTC_OFFSET_HOURS))))
}

pub fn format_gateway_time(at: DateTime<Utc>) -> String {
    (at + Duration::hours(GATEWAY_UTC_OFFSET_HOURS))
        .format(GATEWAY_TIME_FORMAT)
        .to_string()
}
