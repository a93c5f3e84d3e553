//! Format predicates: email, identifiers, addresses and dates

use super::text_of;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use uuid::{Uuid, Variant};

// Compiled once; a pattern that fails to compile makes its rule reject everything.
static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());
static HEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-fA-F0-9]+$").ok());
static TOKEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").ok());
static ALPHANUM: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").ok());

fn matches_pattern(pattern: &Lazy<Option<Regex>>, value: &Value) -> bool {
    match (pattern.as_ref(), text_of(value)) {
        (Some(regex), Some(text)) => regex.is_match(&text),
        _ => false,
    }
}

/// `local@domain.tld`; only string values qualify
pub fn is_email(value: &Value) -> bool {
    match (EMAIL.as_ref(), value.as_str()) {
        (Some(regex), Some(text)) => regex.is_match(text),
        _ => false,
    }
}

pub fn is_hex(value: &Value) -> bool {
    matches_pattern(&HEX, value)
}

/// Letters, digits and underscores
pub fn is_token(value: &Value) -> bool {
    matches_pattern(&TOKEN, value)
}

pub fn is_alphanum(value: &Value) -> bool {
    matches_pattern(&ALPHANUM, value)
}

pub fn is_ip4(value: &Value) -> bool {
    text_of(value).map_or(false, |text| text.parse::<Ipv4Addr>().is_ok())
}

pub fn is_ip6(value: &Value) -> bool {
    text_of(value).map_or(false, |text| text.parse::<Ipv6Addr>().is_ok())
}

/// Either address family
pub fn is_ip(value: &Value) -> bool {
    text_of(value).map_or(false, |text| text.parse::<IpAddr>().is_ok())
}

/// Hyphenated UUID of version 1 through 5 with the RFC 4122 variant
pub fn is_uuid(value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    if text.len() != 36 {
        return false;
    }

    match Uuid::try_parse(text) {
        Ok(uuid) => matches!(uuid.get_version_num(), 1..=5) && uuid.get_variant() == Variant::RFC4122,
        Err(_) => false,
    }
}

/// RFC 3339 timestamps, naive date-times, plain dates, or epoch milliseconds
pub fn is_iso_date(value: &Value) -> bool {
    match value {
        Value::String(text) => {
            DateTime::parse_from_rfc3339(text).is_ok()
                || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
                || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").is_ok()
                || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .is_some(),
        _ => false,
    }
}
