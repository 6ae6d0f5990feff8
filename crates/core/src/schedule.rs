// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Weekly calendar schedule for announcements
//!
//! A schedule is a set of (weekday, time) rules in local time. It is written
//! as a five-field cron expression restricted to weekly recurrence: the
//! day-of-month and month fields must be `*`.

use chrono::{Datelike, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Saturday and Sunday at 20:30
pub const DEFAULT_SCHEDULE: &str = "30 20 * * 6,0";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("expected 5 cron fields, found {0}")]
    FieldCount(usize),
    #[error("invalid {field} field: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("{field} field must be '*' for a weekly schedule, found {value}")]
    NotWeekly { field: &'static str, value: String },
    #[error("schedule has no rules")]
    Empty,
}

/// One weekly firing point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyRule {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl WeeklyRule {
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { weekday, time })
    }

    /// First firing of this rule strictly after `after`
    fn next_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        let today = after.date().weekday().num_days_from_monday();
        let target = self.weekday.num_days_from_monday();
        let days_ahead = (target + 7 - today) % 7;
        let candidate = after.date().and_time(self.time) + TimeDelta::days(i64::from(days_ahead));
        if candidate > after {
            candidate
        } else {
            candidate + TimeDelta::days(7)
        }
    }
}

// Weeks are ordered Monday first
impl Ord for WeeklyRule {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.weekday.num_days_from_monday(), self.time)
            .cmp(&(other.weekday.num_days_from_monday(), other.time))
    }
}

impl PartialOrd for WeeklyRule {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for WeeklyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.weekday, self.time.format("%H:%M"))
    }
}

/// Set of weekly rules
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct WeeklySchedule {
    rules: Vec<WeeklyRule>,
}

impl WeeklySchedule {
    pub fn new(mut rules: Vec<WeeklyRule>) -> Result<Self, ScheduleError> {
        if rules.is_empty() {
            return Err(ScheduleError::Empty);
        }
        rules.sort();
        rules.dedup();
        Ok(Self { rules })
    }

    /// Parse a weekly cron expression (`MIN HOUR * * DOW`)
    ///
    /// Minute and hour accept comma lists. Day-of-week accepts numbers
    /// (0 and 7 are Sunday), names (`sat`), ranges (`1-5`) and `*`.
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(ScheduleError::FieldCount(fields.len()));
        };

        let minutes = parse_numbers(minute, "minute", 59)?;
        let hours = parse_numbers(hour, "hour", 23)?;
        for (field, value) in [("day-of-month", day_of_month), ("month", month)] {
            if *value != "*" {
                return Err(ScheduleError::NotWeekly {
                    field,
                    value: value.to_string(),
                });
            }
        }
        let weekdays = parse_weekdays(day_of_week)?;

        let mut rules = Vec::new();
        for weekday in &weekdays {
            for hour in &hours {
                for minute in &minutes {
                    if let Some(rule) = WeeklyRule::new(*weekday, *hour, *minute) {
                        rules.push(rule);
                    }
                }
            }
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[WeeklyRule] {
        &self.rules
    }

    /// Whether `at` falls on one of the rules (minute resolution)
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        self.rules.iter().any(|rule| {
            rule.weekday == at.weekday()
                && rule.time.hour() == at.hour()
                && rule.time.minute() == at.minute()
        })
    }

    /// Earliest firing strictly after `after`
    pub fn next_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        self.rules
            .iter()
            .map(|rule| rule.next_after(after))
            .min()
            .unwrap_or(after + TimeDelta::days(7))
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        let rules = [Weekday::Sat, Weekday::Sun]
            .into_iter()
            .filter_map(|weekday| WeeklyRule::new(weekday, 20, 30))
            .collect();
        Self { rules }
    }
}

impl fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = self.rules.iter().map(ToString::to_string).collect();
        write!(f, "{}", rules.join(", "))
    }
}

impl FromStr for WeeklySchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WeeklySchedule {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

fn parse_numbers(value: &str, field: &'static str, max: u32) -> Result<Vec<u32>, ScheduleError> {
    let invalid = || ScheduleError::InvalidField {
        field,
        value: value.to_string(),
    };
    value
        .split(',')
        .map(|part| {
            part.parse::<u32>()
                .ok()
                .filter(|n| *n <= max)
                .ok_or_else(invalid)
        })
        .collect()
}

fn parse_weekdays(value: &str) -> Result<Vec<Weekday>, ScheduleError> {
    let invalid = || ScheduleError::InvalidField {
        field: "day-of-week",
        value: value.to_string(),
    };
    if value == "*" {
        return Ok((0..7).filter_map(weekday_from_cron).collect());
    }

    let mut days = Vec::new();
    for part in value.split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = cron_day_number(start).ok_or_else(invalid)?;
                let end = cron_day_number(end).ok_or_else(invalid)?;
                if start > end {
                    return Err(invalid());
                }
                days.extend((start..=end).filter_map(weekday_from_cron));
            }
            None => {
                let n = cron_day_number(part).ok_or_else(invalid)?;
                days.extend(weekday_from_cron(n));
            }
        }
    }
    Ok(days)
}

/// Cron day number (0-7) from a number or weekday name
fn cron_day_number(value: &str) -> Option<u32> {
    match value.parse::<u32>() {
        Ok(n) if n <= 7 => Some(n),
        Ok(_) => None,
        Err(_) => value
            .parse::<Weekday>()
            .ok()
            .map(|day| day.num_days_from_sunday()),
    }
}

fn weekday_from_cron(n: u32) -> Option<Weekday> {
    match n {
        0 | 7 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
