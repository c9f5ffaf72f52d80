//! Lenient date input: RFC 3339 timestamps or plain `YYYY-MM-DD` dates
//! (taken as midnight UTC), as sent by date pickers.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{de::Error, Deserialize, Deserializer};

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn invalid<E: Error>(value: &str) -> E {
    E::custom(format!(
        "invalid date '{}': expected RFC 3339 or YYYY-MM-DD",
        value
    ))
}

pub mod date {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_date(&raw).ok_or_else(|| invalid(&raw))
    }
}

pub mod opt_date {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_date(&raw).map(Some).ok_or_else(|| invalid(&raw)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "opt_date::deserialize")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn accepts_rfc3339_and_plain_dates() {
        let full = parse_date("2024-03-01T10:30:00+05:30").unwrap();
        assert_eq!(full, Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap());

        let plain = parse_date("2024-03-01").unwrap();
        assert_eq!(plain, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        assert!(parse_date("03/01/2024").is_none());
    }

    #[test]
    fn optional_dates_may_be_missing_or_blank() {
        let sample: Sample = serde_json::from_str("{}").unwrap();
        assert!(sample.at.is_none());
        let sample: Sample = serde_json::from_str(r#"{"at": ""}"#).unwrap();
        assert!(sample.at.is_none());
        assert!(serde_json::from_str::<Sample>(r#"{"at": "soon"}"#).is_err());
    }
}
