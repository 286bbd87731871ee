//! (De)serialization helpers for the quirky textual conventions GTFS CSV
//! files use: `0`/`1` booleans, `YYYYMMDD` dates, times that can exceed
//! `23:59:59` for service past midnight, optional floats that show up as an
//! empty string rather than being omitted, and 6-digit hex colors.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rgb::RGB8;
use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,3}):(\d{2}):(\d{2})$").unwrap())
}

pub fn deserialize_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    match s.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(DeError::custom(format!(
            "expected 0 or 1 for a GTFS boolean, got {other:?}"
        ))),
    }
}

pub fn serialize_bool<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(if *value { "1" } else { "0" })
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d")
        .map_err(|e| DeError::custom(format!("invalid GTFS date {s:?}: {e}")))
}

pub fn serialize_date<S>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.format("%Y%m%d").to_string())
}

pub fn deserialize_option_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(Some)
            .map_err(|e| DeError::custom(format!("invalid GTFS date {s:?}: {e}"))),
    }
}

pub fn serialize_option_date<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        None => serializer.serialize_none(),
        Some(d) => serializer.serialize_str(&d.format("%Y%m%d").to_string()),
    }
}

pub fn deserialize_option_unix_date<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let f_secs: Option<f64> = Deserialize::deserialize(deserializer)?;
    match f_secs {
        None => Ok(None),
        Some(secs) => {
            let secs = secs as i64;
            let dt = DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or_else(|| serde::de::Error::custom("Invalid timestamp"))?;
            Ok(Some(dt))
        }
    }
}

/// Parses `H:MM:SS`/`HH:MM:SS` into seconds since midnight. Hours may exceed
/// 23 for trips that run past midnight (GTFS convention); the value is never
/// wrapped back into a 24-hour range.
fn parse_time_to_seconds(s: &str) -> Option<u32> {
    let caps = time_regex().captures(s.trim())?;
    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: u32 = caps.get(3)?.as_str().parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

fn format_seconds_as_time(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn deserialize_time<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_time_to_seconds(&s).ok_or_else(|| DeError::custom(format!("invalid GTFS time {s:?}")))
}

pub fn serialize_time<S>(value: &u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_seconds_as_time(*value))
}

pub fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_time_to_seconds(s)
            .map(Some)
            .ok_or_else(|| DeError::custom(format!("invalid GTFS time {s:?}"))),
    }
}

pub fn serialize_optional_time<S>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        None => serializer.serialize_none(),
        Some(v) => serializer.serialize_str(&format_seconds_as_time(*v)),
    }
}

/// GTFS frequently represents "optional numeric field" as an empty string
/// rather than omitting the column entirely.
pub fn de_with_optional_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|e| DeError::custom(format!("invalid float {s:?}: {e}"))),
    }
}

pub fn serialize_float_as_str<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        None => serializer.serialize_str(""),
        Some(v) => serializer.serialize_str(&v.to_string()),
    }
}

/// Deserializes a value that should default when absent, empty, or invalid,
/// rather than rejecting the row. Used for loosely-specified enum columns
/// such as `wheelchair_boarding` where many real-world feeds emit garbage.
pub fn de_with_empty_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let value: Option<serde_json::Value> = Deserialize::deserialize(deserializer)?;
    match value {
        None => Ok(T::default()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(T::default()),
        Some(v) => serde_json::from_value(v).or_else(|_| Ok(T::default())),
    }
}

pub fn default_route_color() -> RGB8 {
    RGB8::new(0xFF, 0xFF, 0xFF)
}

fn parse_hex_color(s: &str) -> Option<RGB8> {
    let s = s.trim();
    if s.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some(RGB8::new(r, g, b))
}

pub fn deserialize_route_color<'de, D>(deserializer: D) -> Result<RGB8, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(default_route_color()),
        Some(s) => parse_hex_color(s).ok_or_else(|| DeError::custom(format!("invalid color {s:?}"))),
    }
}

pub fn deserialize_route_text_color<'de, D>(deserializer: D) -> Result<RGB8, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(RGB8::new(0, 0, 0)),
        Some(s) => parse_hex_color(s).ok_or_else(|| DeError::custom(format!("invalid color {s:?}"))),
    }
}

pub fn serialize_color<S>(value: &RGB8, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{:02X}{:02X}{:02X}", value.r, value.g, value.b))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Many<T> {
    /// Single value
    One(T),
    /// Array of values
    Many(Vec<T>),
}

impl<T> From<Many<T>> for Vec<T> {
    fn from(from: Many<T>) -> Self {
        match from {
            Many::One(val) => vec![val],
            Many::Many(vec) => vec,
        }
    }
}

impl<T> IntoIterator for Many<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        let vec: Vec<T> = self.into();
        vec.into_iter()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MaybeStringWrapped<T> {
    Str(String),
    Val(T),
}

#[allow(unused)]
impl<T: FromStr> MaybeStringWrapped<T> {
    pub fn into_inner(self) -> Result<T, T::Err> {
        match self {
            MaybeStringWrapped::Str(s) => s.parse(),
            MaybeStringWrapped::Val(v) => Ok(v),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_time_past_midnight() {
        assert_eq!(parse_time_to_seconds("25:30:00"), Some(25 * 3600 + 30 * 60));
    }

    #[test]
    fn formats_round_trips() {
        let secs = 25 * 3600 + 30 * 60 + 5;
        assert_eq!(format_seconds_as_time(secs), "25:30:05");
        assert_eq!(parse_time_to_seconds("25:30:05"), Some(secs));
    }

    #[test]
    fn rejects_malformed_time() {
        assert_eq!(parse_time_to_seconds("not-a-time"), None);
    }

    #[test]
    fn parses_hex_color() {
        assert_eq!(parse_hex_color("FF8800"), Some(RGB8::new(0xFF, 0x88, 0x00)));
        assert_eq!(parse_hex_color("zzzzzz"), None);
    }
}
