//! Primitive value checks.
//!
//! [`check`] answers one question: does this JSON value satisfy this
//! [`ValueDef`]? On mismatch it returns what was expected, in the wording
//! used by failure reasons (`expected IPv4 Address but got ...`).
//!
//! Numbers follow the JSON literal form: `1` is an integer, `1.0` is a float.

use crate::rule::ValueDef;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Padding is optional, but when present it must be complete.
const PADDING: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const BASE64: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PADDING);
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PADDING);

/// Check `data` against a primitive definition.
///
/// # Errors
///
/// Returns the expectation text when `data` does not satisfy `def`.
pub fn check(def: &ValueDef, data: &Value) -> Result<(), String> {
    if matches(def, data) {
        Ok(())
    } else {
        Err(expected(def))
    }
}

/// What `def` expects, as shown in failure reasons.
#[must_use]
pub fn expected(def: &ValueDef) -> String {
    match def {
        ValueDef::IntegerRange { .. } => format!("integer in {def}"),
        ValueDef::FloatRange { .. } => format!("float in {def}"),
        ValueDef::Regex(_) => format!("string matching {def}"),
        ValueDef::Ipv4 => "IPv4 Address".into(),
        ValueDef::Ipv6 => "IPv6 Address".into(),
        ValueDef::IpAddr => "IP Address".into(),
        ValueDef::Fqdn => "Fully Qualified Domain Name".into(),
        ValueDef::Idn => "Internationalized Domain Name".into(),
        ValueDef::Uri => "URI".into(),
        ValueDef::UriScheme(scheme) => format!("URI with scheme {scheme}"),
        ValueDef::UriTemplate(template) => format!("URI template {}", template.source()),
        ValueDef::Email => "Email Address".into(),
        ValueDef::Phone => "Phone Number".into(),
        ValueDef::Hex => "Hex Data".into(),
        ValueDef::Base32 => "Base 32 Data".into(),
        ValueDef::Base32Hex => "Base 32 Hex Data".into(),
        ValueDef::Base64 => "Base 64 Data".into(),
        ValueDef::Base64Url => "Base 64 URL Data".into(),
        ValueDef::DateTime => "Time and Date".into(),
        ValueDef::Date => "Date".into(),
        ValueDef::Time => "Time".into(),
        ValueDef::Enumeration(_) => format!("one of {def}"),
        _ => def.to_string(),
    }
}

fn matches(def: &ValueDef, data: &Value) -> bool {
    match def {
        ValueDef::Any => true,
        ValueDef::Null => data.is_null(),
        ValueDef::Boolean => data.is_boolean(),
        ValueDef::True => data.as_bool() == Some(true),
        ValueDef::False => data.as_bool() == Some(false),
        ValueDef::String => data.is_string(),
        ValueDef::StringLiteral(s) => data.as_str() == Some(s.as_str()),
        ValueDef::Regex(pattern) => data.as_str().is_some_and(|s| pattern.is_match(s)),

        ValueDef::Integer => integer(data).is_some(),
        ValueDef::IntegerLiteral(n) => integer(data) == Some(i128::from(*n)),
        ValueDef::IntegerRange { min, max } => integer(data).is_some_and(|n| {
            min.map_or(true, |min| n >= i128::from(min)) && max.map_or(true, |max| n <= i128::from(max))
        }),
        ValueDef::SizedInteger { bits, signed } => {
            integer(data).is_some_and(|n| sized_bounds(*bits, *signed).contains(&n))
        }
        ValueDef::Float | ValueDef::Double => data.is_f64(),
        ValueDef::FloatLiteral(f) => data.is_f64() && data.as_f64() == Some(*f),
        ValueDef::FloatRange { min, max } => {
            data.is_f64()
                && data.as_f64().is_some_and(|n| {
                    min.map_or(true, |min| n >= min) && max.map_or(true, |max| n <= max)
                })
        }

        ValueDef::Ipv4 => with_str(data, |s| s.parse::<Ipv4Addr>().is_ok()),
        ValueDef::Ipv6 => with_str(data, |s| s.parse::<Ipv6Addr>().is_ok()),
        ValueDef::IpAddr => with_str(data, |s| s.parse::<IpAddr>().is_ok()),
        ValueDef::Fqdn => with_str(data, |s| domain_name(s, false)),
        ValueDef::Idn => with_str(data, |s| domain_name(s, true)),
        ValueDef::Uri => with_str(data, |s| url::Url::parse(s).is_ok()),
        ValueDef::UriScheme(scheme) => with_str(data, |s| {
            url::Url::parse(s).is_ok_and(|u| u.scheme().eq_ignore_ascii_case(scheme))
        }),
        ValueDef::UriTemplate(template) => with_str(data, |s| template.is_match(s)),
        ValueDef::Email => with_str(data, email),
        ValueDef::Phone => with_str(data, phone),

        ValueDef::Hex => with_str(data, |s| {
            !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
        }),
        ValueDef::Base32 => with_str(data, |s| {
            padded(s, |b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b))
        }),
        ValueDef::Base32Hex => with_str(data, |s| {
            padded(s, |b| b.is_ascii_digit() || (b'A'..=b'V').contains(&b))
        }),
        ValueDef::Base64 => with_str(data, |s| !s.is_empty() && BASE64.decode(s).is_ok()),
        ValueDef::Base64Url => with_str(data, |s| !s.is_empty() && BASE64_URL.decode(s).is_ok()),

        ValueDef::DateTime => with_str(data, |s| DateTime::parse_from_rfc3339(s).is_ok()),
        ValueDef::Date => with_str(data, |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
        ValueDef::Time => with_str(data, |s| NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()),

        ValueDef::Enumeration(values) => values.iter().any(|value| matches(value, data)),
    }
}

/// Integer view of a JSON number written without fraction or exponent.
fn integer(data: &Value) -> Option<i128> {
    match data {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        _ => None,
    }
}

fn sized_bounds(bits: u8, signed: bool) -> std::ops::RangeInclusive<i128> {
    let bits = u32::from(bits.min(64));
    if signed {
        let half = 1i128 << (bits - 1);
        -half..=half - 1
    } else {
        0..=(1i128 << bits) - 1
    }
}

fn with_str(data: &Value, f: impl FnOnce(&str) -> bool) -> bool {
    data.as_str().is_some_and(f)
}

/// Labels separated by dots; no label starts or ends with `-`.
fn domain_name(s: &str, international: bool) -> bool {
    if s.is_empty() {
        return false;
    }
    s.split('.').all(|label| {
        !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || (international && !c.is_ascii()))
    })
}

fn email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    let atext = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~-".contains(c);
    !local.is_empty()
        && local.len() <= 64
        && local.split('.').all(|part| !part.is_empty() && part.chars().all(atext))
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
        && domain_name(domain, true)
}

/// International or national number: optional `+`, 7 to 15 digits, common separators.
fn phone(s: &str) -> bool {
    let body = s.strip_prefix('+').unwrap_or(s);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'))
}

/// Base 32 text: alphabet characters, then `=` padding to a whole 8-character
/// block when padded at all. Bodies of 1, 3 or 6 trailing characters never decode.
fn padded(s: &str, alphabet: impl Fn(u8) -> bool) -> bool {
    let body = s.trim_end_matches('=');
    let padding = s.len() - body.len();
    !body.is_empty()
        && body.bytes().all(alphabet)
        && matches!(body.len() % 8, 0 | 2 | 4 | 5 | 7)
        && (padding == 0 || s.len() % 8 == 0)
}
