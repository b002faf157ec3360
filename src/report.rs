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
use telemetry::calibration::{CalibrationReport, ThetaModel};
use telemetry::deviation::{ColumnRangeStudy, ErrorStatistics, GearErrorDiagnostics};
use telemetry::summary::{ColumnStatistics, RouteSummary};
use telemetry::vehicle::{GearingCalculator, VehicleSpec};
use utils::numeric::format_optional;

const DECIMALS: usize = 4;

/// One line of the per-gear calibration table
#[derive(Clone, Debug, PartialEq)]
pub struct GearRow {
    pub gear: u32,
    pub ratio: Option<f64>,
    pub theta: Option<f64>,
    /// `1 / tan(theta)`, engine revolutions per meter
    pub inverse_tan: Option<f64>,
    pub a: Option<f64>,
    pub nominal_theta: Option<f64>,
}

pub fn gear_rows(model: &ThetaModel, vehicle: Option<&VehicleSpec>) -> Vec<GearRow> {
    let gearing = vehicle.and_then(GearingCalculator::from_vehicle);
    model.forward_gears().map(|(gear, calibration)| {
        GearRow {
            gear,
            ratio: vehicle.and_then(|v| v.gear_ratio(gear)),
            theta: calibration.theta,
            inverse_tan: calibration.theta.and_then(|t| utils::numeric::finite(1.0 / t.tan())),
            a: calibration.a,
            nominal_theta: gearing.as_ref().and_then(|g| g.nominal_theta(gear)),
        }
    }).collect()
}

pub fn a_statistics(model: &ThetaModel) -> ColumnStatistics {
    ColumnStatistics::from_values("a", model.forward_gears().map(|(_, c)| c.a))
}

pub fn print_model(vin: &str, model: &ThetaModel, vehicle: Option<&VehicleSpec>) {
    match vehicle {
        Some(v) => println!("Calibration for {} ({})", v.name, vin),
        None => println!("Calibration for {}", vin)
    }
    println!("{:>5} {:>8} {:>10} {:>10} {:>10} {:>10}", "gear", "ratio", "theta", "1/tan", "a", "nominal");
    for row in gear_rows(model, vehicle) {
        println!("{:>5} {:>8} {:>10} {:>10} {:>10} {:>10}",
                 row.gear,
                 format_optional(row.ratio, 2),
                 format_optional(row.theta, DECIMALS),
                 format_optional(row.inverse_tan, DECIMALS),
                 format_optional(row.a, DECIMALS),
                 format_optional(row.nominal_theta, DECIMALS));
    }
    print_column_statistics(&[a_statistics(model)]);
}

pub fn print_calibration_report(report: &CalibrationReport, vehicle: Option<&VehicleSpec>) {
    println!("{} eligible samples, bandwidth {}, {} maxima for {} gears",
             report.eligible_samples,
             format_optional(Some(report.bandwidth), 5),
             report.peaks.len(),
             report.expected_gears);
    for peak in &report.peaks {
        println!("  maximum at theta {} (density {})",
                 format_optional(Some(peak.x), DECIMALS),
                 format_optional(Some(peak.density), 2));
    }
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    print_model(&report.vin, &report.model, vehicle);
}

pub fn print_column_statistics(stats: &[ColumnStatistics]) {
    println!("{:>15} {:>8} {:>6} {:>12} {:>12} {:>12} {:>12}", "column", "count", "null", "min", "max", "mean", "std");
    for s in stats {
        println!("{:>15} {:>8} {:>6} {:>12} {:>12} {:>12} {:>12}",
                 s.column, s.count, s.nulls,
                 format_optional(s.min, DECIMALS),
                 format_optional(s.max, DECIMALS),
                 format_optional(s.mean, DECIMALS),
                 format_optional(s.std_dev, DECIMALS));
    }
}

pub fn print_route_summaries(routes: &[RouteSummary]) {
    println!("{:>6} {:>7} {:>8} {:>8} {:>10} {:>10} {:>10}", "route", "rows", "first i", "last i", "min dur", "max dur", "mean dur");
    for r in routes {
        println!("{:>6} {:>7} {:>8} {:>8} {:>10} {:>10} {:>10}",
                 r.route, r.rows, r.first_i, r.last_i,
                 format_optional(r.duration.min, 3),
                 format_optional(r.duration.max, 3),
                 format_optional(r.duration.mean, 3));
    }
}

pub fn print_gear_counts(counts: &BTreeMap<u32, usize>) {
    println!("{:>5} {:>8}", "gear", "samples");
    for (gear, count) in counts {
        println!("{:>5} {:>8}", gear, count);
    }
}

pub fn print_error_diagnostics(diagnostics: &[GearErrorDiagnostics]) {
    println!("{:>5} {:>8} {:>12} {:>12} {:>12} {:>12}  {}",
             "gear", "samples", "theta mean", "theta std", "dist mean", "dist std", "theta_error maxima");
    for d in diagnostics {
        let maxima = d.theta_error_peaks.iter()
            .map(|p| format_optional(Some(p.x), DECIMALS))
            .collect::<Vec<String>>()
            .join(", ");
        println!("{:>5} {:>8} {:>12} {:>12} {:>12} {:>12}  {}",
                 d.gear, d.samples,
                 format_optional(d.theta_error.map(|s| s.mean), DECIMALS),
                 format_optional(d.theta_error.and_then(|s| s.std_dev), DECIMALS),
                 format_optional(d.distance_error.map(|s| s.mean), DECIMALS),
                 format_optional(d.distance_error.and_then(|s| s.std_dev), DECIMALS),
                 maxima);
    }
}

/// One printed line of a [`ColumnRangeStudy`]
#[derive(Clone, Debug, PartialEq)]
pub struct RangeRow {
    pub scope: String,
    pub column_stats: Option<ErrorStatistics>,
    pub theta_error: Option<ErrorStatistics>,
}

pub fn column_range_rows(study: &ColumnRangeStudy) -> Vec<RangeRow> {
    let mut rows = vec![RangeRow {
        scope: String::from("all"),
        column_stats: study.column_stats,
        theta_error: study.theta_error
    }];
    for gear in &study.gears {
        rows.push(RangeRow {
            scope: format!("gear {}", gear.gear),
            column_stats: gear.column_stats,
            theta_error: gear.theta_error
        });
        rows.extend(gear.bands.iter().map(|band| RangeRow {
            scope: format!("  {}", band.label),
            column_stats: band.column_stats,
            theta_error: band.theta_error
        }));
    }
    rows
}

pub fn print_column_range_study(study: &ColumnRangeStudy) {
    println!("theta_error across {}", study.column);
    println!("{:<32} {:>8} {:>12} {:>12} {:>12} {:>12}",
             "", "count", "value mean", "value std", "theta mean", "theta std");
    for row in column_range_rows(study) {
        println!("{:<32} {:>8} {:>12} {:>12} {:>12} {:>12}",
                 row.scope,
                 row.column_stats.map_or(0, |s| s.count),
                 format_optional(row.column_stats.map(|s| s.mean), DECIMALS),
                 format_optional(row.column_stats.and_then(|s| s.std_dev), DECIMALS),
                 format_optional(row.theta_error.map(|s| s.mean), DECIMALS),
                 format_optional(row.theta_error.and_then(|s| s.std_dev), DECIMALS));
    }
}
