use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "mood_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Neutral,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar-day key in the browser's wire format: `<year>-<month0>-<day>`,
/// where the month is zero-based (January is `0`) and no part is padded.
///
/// Only the canonical spelling of a real calendar date parses, so two
/// different strings can never name the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey {
    year: i32,
    month0: u32,
    day: u32,
}

impl DateKey {
    pub fn date(&self) -> NaiveDate {
        // Constructed only from valid dates.
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, self.day).unwrap_or_default()
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
            day: date.day(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date key {0:?}, expected <year>-<zeroBasedMonth>-<day>")]
pub struct DateKeyError(pub String);

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DateKeyError(s.to_string());

        let mut parts = s.split('-');
        let (Some(y), Some(m), Some(d), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };

        let year: i32 = y.parse().map_err(|_| err())?;
        let month0: u32 = m.parse().map_err(|_| err())?;
        let day: u32 = d.parse().map_err(|_| err())?;

        let date = month0
            .checked_add(1)
            .and_then(|month| NaiveDate::from_ymd_opt(year, month, day))
            .ok_or_else(err)?;
        let key = DateKey::from(date);

        if key.to_string() != s {
            return Err(err());
        }
        Ok(key)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month0, self.day)
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.to_string()
    }
}

/// Sparse mood-by-day mapping for one user.
pub type MoodMap = BTreeMap<DateKey, Mood>;
