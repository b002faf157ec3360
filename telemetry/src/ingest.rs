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


use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use tracing::{info, warn};
use crate::error::{Error, ErrorKind, Result};
use crate::sample::RawSample;

pub const ROUTE_FILE_EXTENSION: &str = "csv";

/// Columns of a logged route file. Anything else in the file is ignored.
#[derive(Debug, Deserialize)]
struct RouteRow {
    #[serde(rename = "RPM")]
    rpm: Option<String>,
    #[serde(rename = "SPEED")]
    speed: Option<String>,
    iso_ts_pre: Option<String>,
    iso_ts_post: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteStats {
    /// Rows with both measurements present
    pub good_rows: usize,
    /// Rows kept with a missing measurement or timestamp
    pub incomplete_rows: usize,
    /// Rows the reader couldn't make sense of at all
    pub skipped_rows: usize,
}

impl RouteStats {
    fn absorb(&mut self, other: RouteStats) {
        self.good_rows += other.good_rows;
        self.incomplete_rows += other.incomplete_rows;
        self.skipped_rows += other.skipped_rows;
    }
}

/// Every sample logged for one vehicle, in route order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VehicleRoutes {
    pub files: Vec<PathBuf>,
    pub samples: Vec<RawSample>,
    pub stats: RouteStats,
}

/// Read one route. A row that fails to parse becomes an empty sample so a
/// single damaged line neither loses the rest of the route nor links the
/// samples either side of it.
pub fn read_route<R: io::Read>(reader: R, route_id: u32) -> (Vec<RawSample>, RouteStats) {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut samples = Vec::new();
    let mut stats = RouteStats::default();
    for row in csv_reader.deserialize::<RouteRow>() {
        match row {
            Ok(row) => {
                let sample = RawSample::from_columns(row.rpm.as_deref(),
                                                     row.speed.as_deref(),
                                                     row.iso_ts_pre.as_deref(),
                                                     row.iso_ts_post.as_deref(),
                                                     route_id);
                if sample.has_measurements() && sample.has_timestamps() {
                    stats.good_rows += 1;
                } else {
                    stats.incomplete_rows += 1;
                }
                samples.push(sample);
            }
            Err(e) => {
                warn!("Skipping row in route {}. {}", route_id, e.to_string());
                stats.skipped_rows += 1;
                samples.push(RawSample::new(None, None, None, None, route_id));
            }
        }
    }
    (samples, stats)
}

pub fn read_route_file(path: &Path, route_id: u32) -> Result<(Vec<RawSample>, RouteStats)> {
    let file = File::open(path).map_err(|e| {
        Error::new(ErrorKind::IOError, format!("Failed to open {}. {}", path.display(), e.to_string()))
    })?;
    Ok(read_route(file, route_id))
}

/// Route files logged for `vin`, sorted by file name
pub fn route_files(data_dir: &Path, vin: &str) -> Result<Vec<PathBuf>> {
    utils::filesystem::get_tagged_files_in_path(data_dir, ROUTE_FILE_EXTENSION, vin).map_err(|e| {
        Error::new(ErrorKind::IOError,
                   format!("Failed to scan {} for routes. {}", data_dir.display(), e.to_string()))
    })
}

/// Load all routes of `vin` from `data_dir`. Each file becomes one route,
/// numbered from 1 in file name order.
pub fn load_vehicle_routes(data_dir: &Path, vin: &str) -> Result<VehicleRoutes> {
    let files = route_files(data_dir, vin)?;
    let mut routes = VehicleRoutes { files, ..VehicleRoutes::default() };
    for (idx, path) in routes.files.iter().enumerate() {
        let route_id = idx as u32 + 1;
        let (mut samples, stats) = read_route_file(path, route_id)?;
        info!("Route {} ({}): {} good rows, {} incomplete, {} skipped",
              route_id, path.display(), stats.good_rows, stats.incomplete_rows, stats.skipped_rows);
        routes.stats.absorb(stats);
        routes.samples.append(&mut samples);
    }
    if routes.files.is_empty() {
        warn!("No route files for {} in {}", vin, data_dir.display());
    }
    info!("{}: {} routes, {} good rows, {} bad rows",
          vin, routes.files.len(), routes.stats.good_rows,
          routes.stats.incomplete_rows + routes.stats.skipped_rows);
    Ok(routes)
}
