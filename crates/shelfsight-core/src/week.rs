//! Week identifiers.
//!
//! The UI labels weeks as `Wo Jan 05 2024`; SQL compares ISO dates
//! (`2024-01-05`) against `DATE_TRUNC('week', date)`. Both spellings parse
//! into the same [`Week`].

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use time::macros::format_description;
use time::{Date, Duration, Month};

use crate::error::ValidationError;

const LABEL_PREFIX: &str = "Wo";

const MONTHS: [(&str, Month); 12] = [
    ("Jan", Month::January),
    ("Feb", Month::February),
    ("Mar", Month::March),
    ("Apr", Month::April),
    ("May", Month::May),
    ("Jun", Month::June),
    ("Jul", Month::July),
    ("Aug", Month::August),
    ("Sep", Month::September),
    ("Oct", Month::October),
    ("Nov", Month::November),
    ("Dec", Month::December),
];

/// Start date of a reporting week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Week(Date);

impl Week {
    pub const fn new(date: Date) -> Self {
        Self(date)
    }

    /// Parse either a `Wo Mon DD YYYY` label or an ISO `YYYY-MM-DD` date.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        parse_label(trimmed)
            .or_else(|| parse_iso(trimmed))
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidWeek {
                value: value.to_string(),
            })
    }

    pub const fn date(self) -> Date {
        self.0
    }

    /// `YYYY-MM-DD`, the form bound into SQL.
    pub fn iso(self) -> String {
        self.0.to_string()
    }

    /// `Wo Mon DD YYYY`, the form shown in the UI.
    pub fn label(self) -> String {
        let month = MONTHS
            .iter()
            .find(|(_, month)| *month == self.0.month())
            .map(|(abbreviation, _)| *abbreviation)
            .unwrap_or("???");
        format!(
            "{LABEL_PREFIX} {month} {:02} {}",
            self.0.day(),
            self.0.year()
        )
    }

    /// The week seven days earlier.
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(Duration::days(7)).map(Self)
    }
}

impl Display for Week {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Week {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn parse_label(value: &str) -> Option<Date> {
    let mut parts = value.split_whitespace();
    let prefix = parts.next()?;
    if !prefix.eq_ignore_ascii_case(LABEL_PREFIX) {
        return None;
    }
    let month_name = parts.next()?;
    let month = MONTHS
        .iter()
        .find(|(abbreviation, _)| abbreviation.eq_ignore_ascii_case(month_name))
        .map(|(_, month)| *month)?;
    let day = parts.next()?.parse::<u8>().ok()?;
    let year = parts.next()?.parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Date::from_calendar_date(year, month, day).ok()
}

fn parse_iso(value: &str) -> Option<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).ok()
}

/// Parse every week in `values`, failing on the first malformed one.
pub fn parse_weeks(values: &[String]) -> Result<Vec<Week>, ValidationError> {
    values.iter().map(|value| Week::parse(value)).collect()
}
