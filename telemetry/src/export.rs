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


use std::io;
use std::path::Path;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;
use crate::deviation::ErrorRecord;
use crate::error::{Error, ErrorKind, Result};

pub const OUTPUT_COLUMNS: [&str; 17] = [
    "i", "route", "RPM", "SPEED", "rps", "mps", "theta", "radius", "m_per_r", "r_per_m",
    "closest_gear", "acceleration", "duration", "iso_ts_pre", "iso_ts_post",
    "distance_error", "theta_error"
];

/// Field order must match [`OUTPUT_COLUMNS`]
#[derive(Debug, Serialize)]
struct OutputRow {
    i: u64,
    route: u32,
    rpm: Option<f64>,
    speed: Option<f64>,
    rps: Option<f64>,
    mps: Option<f64>,
    theta: Option<f64>,
    radius: Option<f64>,
    m_per_r: Option<f64>,
    r_per_m: Option<f64>,
    closest_gear: u32,
    acceleration: Option<f64>,
    duration: Option<f64>,
    iso_ts_pre: Option<String>,
    iso_ts_post: Option<String>,
    distance_error: Option<f64>,
    theta_error: Option<f64>,
}

impl From<&ErrorRecord> for OutputRow {
    fn from(record: &ErrorRecord) -> Self {
        let f = &record.feature;
        OutputRow {
            i: f.i,
            route: f.route,
            rpm: f.rpm,
            speed: f.speed,
            rps: f.rps,
            mps: f.mps,
            theta: f.theta,
            radius: f.radius,
            m_per_r: f.m_per_r,
            r_per_m: f.r_per_m,
            closest_gear: f.closest_gear,
            acceleration: f.acceleration,
            duration: f.duration,
            iso_ts_pre: f.iso_ts_pre.map(format_timestamp),
            iso_ts_post: f.iso_ts_post.map(format_timestamp),
            distance_error: record.distance_error,
            theta_error: record.theta_error,
        }
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn output_file_name(vin: &str) -> String {
    format!("{}_classified.csv", vin)
}

/// Write `records` as CSV. Missing values are written as empty cells and the
/// header is always present, even without any records.
pub fn write_records<W: io::Write>(writer: W, records: &[ErrorRecord]) -> Result<W> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        csv_writer.serialize(OutputRow::from(record))?;
    }
    csv_writer.into_inner().map_err(|e| {
        Error::new(ErrorKind::IOError, format!("Failed to flush output. {}", e.to_string()))
    })
}

pub fn export_to_path(path: &Path, records: &[ErrorRecord]) -> Result<()> {
    let contents = write_records(Vec::new(), records)?;
    utils::filesystem::write_file_atomic(path, &contents).map_err(|e| {
        Error::new(ErrorKind::IOError, format!("Failed to write {}. {}", path.display(), e.to_string()))
    })?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
