/*
 * Copyright (c):
 * 2024 zephyrj
 * zephyrj@protonmail.com
 *
 * This file is part of gear-study.
 *
 * gear-study is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * gear-study is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gear-study. If not, see <https://www.gnu.org/licenses/>.
 */

use chrono::{DateTime, NaiveDateTime, Utc};

/// One telemetry observation as handed over by the logging/CSV layer.
///
/// `rpm` and `speed` are `None` when the logger wrote nothing usable for the
/// column. Timestamps are `None` when they could not be parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSample {
    pub rpm: Option<f64>,
    pub speed: Option<f64>,
    pub iso_ts_pre: Option<DateTime<Utc>>,
    pub iso_ts_post: Option<DateTime<Utc>>,
    pub route_id: u32,
}

impl RawSample {
    pub fn new(rpm: Option<f64>,
               speed: Option<f64>,
               iso_ts_pre: Option<DateTime<Utc>>,
               iso_ts_post: Option<DateTime<Utc>>,
               route_id: u32) -> RawSample {
        RawSample { rpm, speed, iso_ts_pre, iso_ts_post, route_id }
    }

    /// Build a sample from the textual column values of a logged row
    pub fn from_columns(rpm: Option<&str>,
                        speed: Option<&str>,
                        iso_ts_pre: Option<&str>,
                        iso_ts_post: Option<&str>,
                        route_id: u32) -> RawSample {
        RawSample {
            rpm: rpm.and_then(parse_measurement),
            speed: speed.and_then(parse_measurement),
            iso_ts_pre: iso_ts_pre.and_then(parse_timestamp),
            iso_ts_post: iso_ts_post.and_then(parse_timestamp),
            route_id
        }
    }

    pub fn has_measurements(&self) -> bool {
        self.rpm.is_some() && self.speed.is_some()
    }

    pub fn has_timestamps(&self) -> bool {
        self.iso_ts_pre.is_some() && self.iso_ts_post.is_some()
    }
}

/// Parse a numeric column. Empty, non-numeric and non-finite values yield `None`.
pub fn parse_measurement(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => utils::numeric::finite(v),
        Err(_) => None
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    None
}
