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


use std::collections::BTreeMap;
use itertools::{Itertools, MinMaxResult};
use statrs::statistics::Statistics;
use crate::deviation::ErrorRecord;
use crate::feature::FeatureRecord;

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStatistics {
    pub column: String,
    pub count: usize,
    pub nulls: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub std_dev: Option<f64>,
}

impl ColumnStatistics {
    pub fn from_values<I>(column: &str, values: I) -> ColumnStatistics
        where I: IntoIterator<Item = Option<f64>>
    {
        let mut nulls = 0;
        let present: Vec<f64> = values.into_iter()
            .filter_map(|v| {
                let v = v.and_then(utils::numeric::finite);
                if v.is_none() {
                    nulls += 1;
                }
                v
            })
            .collect();
        let (min, max) = match present.iter().copied().minmax() {
            MinMaxResult::NoElements => (None, None),
            MinMaxResult::OneElement(v) => (Some(v), Some(v)),
            MinMaxResult::MinMax(lo, hi) => (Some(lo), Some(hi))
        };
        let mean = match present.is_empty() {
            true => None,
            false => Some(present.iter().mean())
        };
        let std_dev = match present.len() {
            0 | 1 => None,
            _ => utils::numeric::finite(present.iter().std_dev())
        };
        ColumnStatistics { column: column.to_string(), count: present.len(), nulls, min, max, mean, std_dev }
    }
}

pub type ColumnAccessor = fn(&ErrorRecord) -> Option<f64>;

const NUMERIC_COLUMNS: [(&str, ColumnAccessor); 12] = [
    ("RPM", |r: &ErrorRecord| r.feature.rpm),
    ("SPEED", |r: &ErrorRecord| r.feature.speed),
    ("rps", |r: &ErrorRecord| r.feature.rps),
    ("mps", |r: &ErrorRecord| r.feature.mps),
    ("theta", |r: &ErrorRecord| r.feature.theta),
    ("radius", |r: &ErrorRecord| r.feature.radius),
    ("m_per_r", |r: &ErrorRecord| r.feature.m_per_r),
    ("r_per_m", |r: &ErrorRecord| r.feature.r_per_m),
    ("acceleration", |r: &ErrorRecord| r.feature.acceleration),
    ("duration", |r: &ErrorRecord| r.feature.duration),
    ("distance_error", |r: &ErrorRecord| r.distance_error),
    ("theta_error", |r: &ErrorRecord| r.theta_error),
];

/// Reader for the numeric output column called `name`
pub fn column_accessor(name: &str) -> Option<ColumnAccessor> {
    NUMERIC_COLUMNS.iter().find(|(column, _)| *column == name).map(|(_, accessor)| *accessor)
}

pub fn numeric_column_names() -> impl Iterator<Item = &'static str> {
    NUMERIC_COLUMNS.iter().map(|(column, _)| *column)
}

/// Statistics for every numeric output column
pub fn basic_statistics(records: &[ErrorRecord]) -> Vec<ColumnStatistics> {
    NUMERIC_COLUMNS.iter()
        .map(|(name, accessor)| ColumnStatistics::from_values(name, records.iter().map(accessor)))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteSummary {
    pub route: u32,
    pub rows: usize,
    pub first_i: u64,
    pub last_i: u64,
    pub duration: ColumnStatistics,
}

/// One summary per route, ascending by route
pub fn route_summaries<'a, I>(records: I) -> Vec<RouteSummary>
    where I: IntoIterator<Item = &'a FeatureRecord>
{
    let mut by_route: BTreeMap<u32, Vec<&FeatureRecord>> = BTreeMap::new();
    for record in records {
        by_route.entry(record.route).or_default().push(record);
    }
    by_route.into_iter().filter_map(|(route, rows)| {
        let (first_i, last_i) = rows.iter().map(|r| r.i).minmax().into_option()?;
        Some(RouteSummary {
            route,
            rows: rows.len(),
            first_i,
            last_i,
            duration: ColumnStatistics::from_values("duration", rows.iter().map(|r| r.duration))
        })
    }).collect()
}

/// Number of records assigned to each gear, including gear 0
pub fn gear_counts<'a, I>(records: I) -> BTreeMap<u32, usize>
    where I: IntoIterator<Item = &'a FeatureRecord>
{
    records.into_iter().map(|r| r.closest_gear).counts().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use crate::calibration::{GearCalibration, ThetaModel};
    use crate::classifier::classify_records;
    use crate::deviation::estimate_errors;
    use crate::feature::build_features;
    use crate::summary::{basic_statistics, gear_counts, route_summaries, ColumnStatistics};
    use crate::test_support::sample_at;

    #[test]
    fn column_statistics() {
        let stats = ColumnStatistics::from_values("x", vec![Some(1.0), None, Some(3.0), Some(f64::NAN), Some(2.0)]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.nulls, 2);
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(3.0));
        assert_relative_eq!(stats.mean.unwrap(), 2.0);
        assert_relative_eq!(stats.std_dev.unwrap(), 1.0);

        let single = ColumnStatistics::from_values("x", vec![Some(4.0)]);
        assert_eq!(single.min, Some(4.0));
        assert_eq!(single.std_dev, None);

        let empty = ColumnStatistics::from_values("x", vec![None, None]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.nulls, 2);
        assert_eq!(empty.mean, None);
    }

    #[test]
    fn summaries() {
        let mut records = build_features(&[
            sample_at(0, Some(600.0), Some(10.0), 1),
            sample_at(1, Some(2400.0), Some(10.0), 1),
            sample_at(2, None, Some(10.0), 2),
        ]);
        let model = ThetaModel::from_gears([
            (1, GearCalibration::new(Some(0.10), None)),
            (2, GearCalibration::new(Some(0.40), None)),
        ]);
        classify_records(&mut records, Some(&model));

        let routes = route_summaries(&records);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].rows, 2);
        assert_eq!((routes[0].first_i, routes[0].last_i), (1, 2));
        assert_relative_eq!(routes[0].duration.mean.unwrap(), 0.25);
        assert_eq!((routes[1].first_i, routes[1].last_i), (3, 3));

        let counts = gear_counts(&records);
        assert_eq!(counts.get(&0), Some(&1));
        assert_eq!(counts.get(&1), Some(&1));
        assert_eq!(counts.get(&2), Some(&1));

        let errors = estimate_errors(records, Some(&model));
        let stats = basic_statistics(&errors);
        assert_eq!(stats.len(), 12);
        let rpm = stats.iter().find(|s| s.column == "RPM").unwrap();
        assert_eq!((rpm.count, rpm.nulls), (2, 1));
        let theta_error = stats.iter().find(|s| s.column == "theta_error").unwrap();
        assert_eq!(theta_error.count, 2);
    }
}
