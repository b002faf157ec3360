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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utils::units::{rpm_to_rps, speed_to_mps};
use crate::sample::RawSample;

/// Engineering-unit view of a single [`RawSample`].
///
/// Everything except `closest_gear` is fixed when the record is built.
/// `closest_gear` stays 0 until a calibration is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRecord {
    pub i: u64,
    pub route: u32,
    pub rpm: Option<f64>,
    pub speed: Option<f64>,
    pub rps: Option<f64>,
    pub mps: Option<f64>,
    pub theta: Option<f64>,
    pub radius: Option<f64>,
    pub m_per_r: Option<f64>,
    pub r_per_m: Option<f64>,
    pub acceleration: Option<f64>,
    pub duration: Option<f64>,
    pub iso_ts_pre: Option<DateTime<Utc>>,
    pub iso_ts_post: Option<DateTime<Utc>>,
    pub closest_gear: u32,
}

/// Bounds a record has to sit inside before it is allowed to shape a calibration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EligibilityLimits {
    pub max_speed: f64,
    pub min_rpm: f64,
    pub max_rpm: f64,
}

impl Default for EligibilityLimits {
    fn default() -> Self {
        EligibilityLimits { max_speed: 130.0, min_rpm: 400.0, max_rpm: 5000.0 }
    }
}

impl EligibilityLimits {
    /// Accelerating, moving, and with the engine inside its normal operating band
    pub fn is_eligible(&self, record: &FeatureRecord) -> bool {
        let accelerating = matches!(record.acceleration, Some(a) if a > 0.0);
        let speed_ok = matches!(record.speed, Some(s) if s > 0.0 && s <= self.max_speed);
        let rpm_ok = matches!(record.rpm, Some(r) if r >= self.min_rpm && r <= self.max_rpm);
        accelerating && speed_ok && rpm_ok && record.theta.is_some()
    }

    pub fn eligible<'a>(&self, records: &'a [FeatureRecord]) -> Vec<&'a FeatureRecord> {
        records.iter().filter(|r| self.is_eligible(r)).collect()
    }
}

#[derive(Clone, Copy, Debug)]
struct PreviousSample {
    mps: f64,
    iso_ts_post: DateTime<Utc>,
}

/// Turns an ordered stream of samples into [`FeatureRecord`]s.
///
/// Acceleration needs the previous valid sample of the same route, so the
/// builder tracks it and forgets it at every route change and after every
/// sample with missing measurements or timestamps.
#[derive(Debug)]
pub struct FeatureBuilder {
    next_index: u64,
    current_route: Option<u32>,
    previous: Option<PreviousSample>,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        FeatureBuilder::new()
    }
}

impl FeatureBuilder {
    pub fn new() -> FeatureBuilder {
        FeatureBuilder::starting_at(1)
    }

    pub fn starting_at(first_index: u64) -> FeatureBuilder {
        FeatureBuilder { next_index: first_index, current_route: None, previous: None }
    }

    pub fn push(&mut self, sample: &RawSample) -> FeatureRecord {
        if self.current_route != Some(sample.route_id) {
            self.current_route = Some(sample.route_id);
            self.previous = None;
        }

        let i = self.next_index;
        self.next_index += 1;

        let duration = match (sample.iso_ts_pre, sample.iso_ts_post) {
            (Some(pre), Some(post)) => Some(seconds_between(pre, post)),
            _ => None
        };

        let mut record = FeatureRecord {
            i,
            route: sample.route_id,
            rpm: sample.rpm,
            speed: sample.speed,
            rps: None,
            mps: None,
            theta: None,
            radius: None,
            m_per_r: None,
            r_per_m: None,
            acceleration: None,
            duration,
            iso_ts_pre: sample.iso_ts_pre,
            iso_ts_post: sample.iso_ts_post,
            closest_gear: 0,
        };

        let (rpm, speed) = match (sample.rpm, sample.speed) {
            (Some(rpm), Some(speed)) => (rpm, speed),
            _ => {
                self.previous = None;
                return record;
            }
        };

        let rps = rpm_to_rps(rpm);
        let mps = speed_to_mps(speed);
        record.rps = Some(rps);
        record.mps = Some(mps);
        record.theta = Some(mps.atan2(rps));
        record.radius = Some(rps.hypot(mps));
        record.m_per_r = ratio(mps, rps);
        record.r_per_m = ratio(rps, mps);

        let post = match (sample.iso_ts_pre, sample.iso_ts_post) {
            (Some(_), Some(post)) => post,
            _ => {
                self.previous = None;
                return record;
            }
        };

        if let Some(previous) = self.previous {
            let dt = seconds_between(previous.iso_ts_post, post);
            if dt > 0.0 {
                record.acceleration = Some((mps - previous.mps) / dt);
            }
        }
        self.previous = Some(PreviousSample { mps, iso_ts_post: post });
        record
    }
}

/// Build one record per sample, preserving order. Indices start at 1.
pub fn build_features(samples: &[RawSample]) -> Vec<FeatureRecord> {
    let mut builder = FeatureBuilder::new();
    samples.iter().map(|s| builder.push(s)).collect()
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0
    }
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    utils::numeric::finite(numerator / denominator)
}
