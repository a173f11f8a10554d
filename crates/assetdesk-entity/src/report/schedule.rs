//! Schedule fields of a report definition.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use assetdesk_core::AppError;

/// How often a scheduled report runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Once per calendar day.
    Daily,
    /// Once per Monday-started week, on `schedule_day`.
    Weekly,
    /// Once per calendar month, on `schedule_day`.
    Monthly,
}

impl Frequency {
    /// Return the frequency as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(AppError::validation(format!(
                "Invalid frequency: '{s}'. Expected one of: daily, weekly, monthly"
            ))),
        }
    }
}

/// The `schedule_day` column, parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDay {
    /// A weekday name, for weekly schedules.
    Weekday(Weekday),
    /// A day of the month in `1..=31`, for monthly schedules.
    DayOfMonth(u32),
}

impl ScheduleDay {
    /// The weekday, if this is one.
    pub fn weekday(&self) -> Option<Weekday> {
        match self {
            Self::Weekday(w) => Some(*w),
            Self::DayOfMonth(_) => None,
        }
    }

    /// The day of month, if this is one.
    pub fn day_of_month(&self) -> Option<u32> {
        match self {
            Self::DayOfMonth(d) => Some(*d),
            Self::Weekday(_) => None,
        }
    }
}

impl FromStr for ScheduleDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(day) = trimmed.parse::<u32>() {
            return if (1..=31).contains(&day) {
                Ok(Self::DayOfMonth(day))
            } else {
                Err(AppError::validation(format!(
                    "Invalid schedule day: {day}. Day of month must be between 1 and 31"
                )))
            };
        }
        let weekday = match trimmed.to_lowercase().as_str() {
            "monday" | "mon" => Weekday::Mon,
            "tuesday" | "tue" => Weekday::Tue,
            "wednesday" | "wed" => Weekday::Wed,
            "thursday" | "thu" => Weekday::Thu,
            "friday" | "fri" => Weekday::Fri,
            "saturday" | "sat" => Weekday::Sat,
            "sunday" | "sun" => Weekday::Sun,
            _ => {
                return Err(AppError::validation(format!(
                    "Invalid schedule day: '{s}'. Expected a weekday name or a day of month"
                )));
            }
        };
        Ok(Self::Weekday(weekday))
    }
}

impl fmt::Display for ScheduleDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekday(w) => {
                let name = match w {
                    Weekday::Mon => "monday",
                    Weekday::Tue => "tuesday",
                    Weekday::Wed => "wednesday",
                    Weekday::Thu => "thursday",
                    Weekday::Fri => "friday",
                    Weekday::Sat => "saturday",
                    Weekday::Sun => "sunday",
                };
                write!(f, "{name}")
            }
            Self::DayOfMonth(d) => write!(f, "{d}"),
        }
    }
}

/// The scheduling triple evaluated by the due check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    /// Run frequency.
    pub frequency: Option<Frequency>,
    /// Weekday or day-of-month.
    pub day: Option<ScheduleDay>,
    /// Time of day, UTC.
    pub time: Option<NaiveTime>,
}

impl Schedule {
    /// Build from stored columns. An unparsable day is treated as absent,
    /// which makes weekly and monthly schedules never due.
    pub fn from_stored(
        frequency: Option<Frequency>,
        day: Option<&str>,
        time: Option<NaiveTime>,
    ) -> Self {
        Self {
            frequency,
            day: day.and_then(|d| d.parse().ok()),
            time,
        }
    }

    /// Check the definition invariants for a schedule about to be saved.
    ///
    /// Returns the normalized `schedule_day` text to store.
    pub fn validate(
        is_scheduled: bool,
        frequency: Option<Frequency>,
        day: Option<&str>,
        time: Option<NaiveTime>,
    ) -> Result<Option<String>, AppError> {
        let day = day
            .filter(|d| !d.trim().is_empty())
            .map(str::parse::<ScheduleDay>)
            .transpose()?;

        if !is_scheduled {
            return Ok(day.map(|d| d.to_string()));
        }

        let frequency = frequency.ok_or_else(|| {
            AppError::validation("A scheduled report requires a frequency")
        })?;
        if time.is_none() {
            return Err(AppError::validation(
                "A scheduled report requires a schedule time",
            ));
        }

        match (frequency, day) {
            (Frequency::Daily, _) => {}
            (Frequency::Weekly, Some(ScheduleDay::Weekday(_))) => {}
            (Frequency::Weekly, _) => {
                return Err(AppError::validation(
                    "A weekly schedule requires a weekday name as schedule day",
                ));
            }
            (Frequency::Monthly, Some(ScheduleDay::DayOfMonth(_))) => {}
            (Frequency::Monthly, _) => {
                return Err(AppError::validation(
                    "A monthly schedule requires a day of month (1-31) as schedule day",
                ));
            }
        }

        Ok(day.map(|d| d.to_string()))
    }
}
