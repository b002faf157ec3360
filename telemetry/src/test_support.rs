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

use chrono::{DateTime, Duration, TimeZone, Utc};
use statrs::distribution::{ContinuousCDF, Normal};
use crate::sample::RawSample;

/// Evenly spread quantiles of a normal distribution. Deterministic stand-in
/// for a sampled cluster.
pub(crate) fn cluster(mean: f64, std_dev: f64, count: usize) -> Vec<f64> {
    let normal = Normal::new(mean, std_dev).unwrap();
    (0..count).map(|k| normal.inverse_cdf((k as f64 + 0.5) / count as f64)).collect()
}

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap()
}

/// Sample logged `second` seconds after [`start_time`], taking 250ms
pub(crate) fn sample_at(second: i64, rpm: Option<f64>, speed: Option<f64>, route_id: u32) -> RawSample {
    let pre = start_time() + Duration::seconds(second);
    let post = pre + Duration::milliseconds(250);
    RawSample::new(rpm, speed, Some(pre), Some(post), route_id)
}

/// RPM/SPEED pair lying exactly on the line at `theta` in (rps, mps) space
pub(crate) fn rpm_speed_on_line(rpm: f64, theta: f64) -> (f64, f64) {
    let rps = rpm / 60.0;
    let mps = rps * theta.tan();
    (rpm, mps / utils::units::SPEED_TO_MPS)
}
