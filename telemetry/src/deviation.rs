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

//! How far classified samples sit from their gear's line.
//!
//! `distance_error` is the signed perpendicular distance from `(rps, mps)` to
//! the line through the origin at the gear's angle, written as
//! `tan(theta) * x - y = 0`. It is positive when the sample is below the line,
//! i.e. the road speed is lower than the gear predicts for that engine speed.
//! `theta_error` is `gear_theta - sample_theta`.

use std::f64::consts::PI;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;
use crate::calibration::{ThetaModel, UNCLASSIFIED_GEAR};
use crate::density::{self, DensityPeak, KdeSettings};
use crate::error::{Error, ErrorKind, Result};
use crate::feature::FeatureRecord;
use crate::summary;

/// `(a*x0 + b*y0 + c) / sqrt(a^2 + b^2)` for the line `a*x + b*y + c = 0`
pub fn signed_point_to_line_distance(x0: f64, y0: f64, a: f64, b: f64, c: f64) -> f64 {
    ((a * x0) + (b * y0) + c) / ((a * a) + (b * b)).sqrt()
}

pub fn signed_point_to_theta_line_distance(x: f64, y: f64, theta: f64) -> f64 {
    signed_point_to_line_distance(x, y, theta.tan(), -1.0, 0.0)
}

/// A classified [`FeatureRecord`] with its deviation from the gear model
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorRecord {
    pub feature: FeatureRecord,
    pub distance_error: Option<f64>,
    pub theta_error: Option<f64>,
}

pub fn estimate_error(feature: FeatureRecord, model: Option<&ThetaModel>) -> ErrorRecord {
    let gear_theta = match model {
        Some(model) if feature.closest_gear != UNCLASSIFIED_GEAR => model.theta(feature.closest_gear),
        _ => None
    };
    let (distance_error, theta_error) = match (gear_theta, feature.rps, feature.mps, feature.theta) {
        (Some(gear_theta), Some(rps), Some(mps), Some(theta)) => {
            (utils::numeric::finite(signed_point_to_theta_line_distance(rps, mps, gear_theta)),
             utils::numeric::finite(gear_theta - theta))
        }
        _ => (None, None)
    };
    ErrorRecord { feature, distance_error, theta_error }
}

pub fn estimate_errors(features: Vec<FeatureRecord>, model: Option<&ThetaModel>) -> Vec<ErrorRecord> {
    features.into_iter().map(|f| estimate_error(f, model)).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatistics {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, `None` below two values
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl ErrorStatistics {
    pub fn from_values(values: &[f64]) -> Option<ErrorStatistics> {
        if values.is_empty() {
            return None;
        }
        let std_dev = match values.len() {
            1 => None,
            _ => utils::numeric::finite(values.iter().std_dev())
        };
        Some(ErrorStatistics {
            count: values.len(),
            mean: values.iter().mean(),
            std_dev,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Distribution of the deviations of every sample assigned to one gear
#[derive(Clone, Debug, PartialEq)]
pub struct GearErrorDiagnostics {
    pub gear: u32,
    pub samples: usize,
    pub theta_error: Option<ErrorStatistics>,
    pub distance_error: Option<ErrorStatistics>,
    /// Local maxima of the theta_error density, empty when it can't be estimated
    pub theta_error_peaks: Vec<DensityPeak>,
}

pub fn gear_error_diagnostics(records: &[ErrorRecord],
                              model: &ThetaModel,
                              settings: &KdeSettings) -> Vec<GearErrorDiagnostics> {
    model.forward_gears().map(|(gear, _)| {
        let in_gear: Vec<&ErrorRecord> = records.iter()
            .filter(|r| r.feature.closest_gear == gear)
            .filter(|r| matches!(r.feature.theta, Some(t) if (0.0..=PI).contains(&t)))
            .collect();
        let theta_errors: Vec<f64> = in_gear.iter().filter_map(|r| r.theta_error).collect();
        let distance_errors: Vec<f64> = in_gear.iter().filter_map(|r| r.distance_error).collect();
        let theta_error = ErrorStatistics::from_values(&theta_errors);

        let theta_error_peaks = match theta_error {
            Some(stats) if stats.count >= 2 && stats.min < stats.max => {
                match density::estimate(&theta_errors, settings) {
                    Ok(estimate) => estimate.peaks,
                    Err(e) => {
                        debug!("No theta_error density for gear {}. {}", gear, e.to_string());
                        Vec::new()
                    }
                }
            }
            _ => {
                debug!("Skipping theta_error density for gear {}, not enough spread", gear);
                Vec::new()
            }
        };

        GearErrorDiagnostics {
            gear,
            samples: in_gear.len(),
            theta_error,
            distance_error: ErrorStatistics::from_values(&distance_errors),
            theta_error_peaks
        }
    }).collect()
}

/// Samples of one gear whose column value lies within a band around the
/// gear's mean, measured in standard deviations
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnBand {
    pub label: &'static str,
    pub lower: f64,
    pub upper: f64,
    pub column_stats: Option<ErrorStatistics>,
    pub theta_error: Option<ErrorStatistics>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GearColumnRange {
    pub gear: u32,
    pub column_stats: Option<ErrorStatistics>,
    pub theta_error: Option<ErrorStatistics>,
    /// Empty when the gear has too few values for a standard deviation
    pub bands: Vec<ColumnBand>,
}

/// How theta_error behaves across the range of another column, overall and
/// per classified gear
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRangeStudy {
    pub column: String,
    pub column_stats: Option<ErrorStatistics>,
    pub theta_error: Option<ErrorStatistics>,
    pub gears: Vec<GearColumnRange>,
}

/// (label, lower sigmas, upper sigmas, upper bound inclusive)
const COLUMN_BANDS: [(&str, f64, f64, bool); 4] = [
    ("mean-2sd <= value < mean-sd", -2.0, -1.0, false),
    ("mean-sd <= value < mean", -1.0, 0.0, false),
    ("mean <= value < mean+sd", 0.0, 1.0, false),
    ("mean+sd <= value <= mean+2sd", 1.0, 2.0, true),
];

fn value_and_theta_error_statistics<I>(rows: I) -> (Option<ErrorStatistics>, Option<ErrorStatistics>)
    where I: IntoIterator<Item = (f64, Option<f64>)>
{
    let (values, theta_errors): (Vec<f64>, Vec<Option<f64>>) = rows.into_iter().unzip();
    let theta_errors: Vec<f64> = theta_errors.into_iter().flatten().collect();
    (ErrorStatistics::from_values(&values), ErrorStatistics::from_values(&theta_errors))
}

fn column_bands(values: &[(f64, Option<f64>)], stats: Option<ErrorStatistics>) -> Vec<ColumnBand> {
    let (mean, std_dev) = match stats {
        Some(ErrorStatistics { mean, std_dev: Some(std_dev), .. }) => (mean, std_dev),
        _ => return Vec::new()
    };
    COLUMN_BANDS.iter().map(|(label, low, high, inclusive)| {
        let lower = mean + low * std_dev;
        let upper = mean + high * std_dev;
        let (column_stats, theta_error) = value_and_theta_error_statistics(
            values.iter().copied().filter(|(v, _)| *v >= lower && (*v < upper || (*inclusive && *v <= upper)))
        );
        ColumnBand { label: *label, lower, upper, column_stats, theta_error }
    }).collect()
}

/// Split the records with a value in `column` by gear, then split each
/// gear's values into four bands from two standard deviations below its mean
/// to two above. Unclassified records only count towards the overall figures.
pub fn column_range_study(records: &[ErrorRecord], column: &str) -> Result<ColumnRangeStudy> {
    let accessor = summary::column_accessor(column).ok_or_else(|| {
        Error::new(ErrorKind::ArgumentError,
                   format!("{} is not a numeric column, expected one of {}",
                           column, summary::numeric_column_names().join(", ")))
    })?;
    let rows: Vec<(u32, f64, Option<f64>)> = records.iter()
        .filter_map(|r| {
            accessor(r).and_then(utils::numeric::finite).map(|v| (r.feature.closest_gear, v, r.theta_error))
        })
        .collect();
    let (column_stats, theta_error) = value_and_theta_error_statistics(rows.iter().map(|(_, v, t)| (*v, *t)));

    let gears = rows.iter()
        .map(|(gear, _, _)| *gear)
        .filter(|gear| *gear != UNCLASSIFIED_GEAR)
        .sorted()
        .dedup()
        .map(|gear| {
            let in_gear: Vec<(f64, Option<f64>)> = rows.iter()
                .filter(|(g, _, _)| *g == gear)
                .map(|(_, v, t)| (*v, *t))
                .collect();
            let (column_stats, theta_error) = value_and_theta_error_statistics(in_gear.iter().copied());
            GearColumnRange { gear, column_stats, theta_error, bands: column_bands(&in_gear, column_stats) }
        })
        .collect();
    Ok(ColumnRangeStudy { column: column.to_string(), column_stats, theta_error, gears })
}
