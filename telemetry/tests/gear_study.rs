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


use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use telemetry::calibration::CalibrationStore;
use telemetry::density::{Bandwidth, KdeSettings};
use telemetry::export::{export_to_path, output_file_name, write_records};
use telemetry::vehicle::VehicleRegistry;
use telemetry::{ErrorKind, GearStudy, StudyOptions};

const VIN: &str = "1FTFW1E50PFA00000";
const IDLE_VIN: &str = "C4HJ0000000000000";

const VEHICLES: &str = r#"
["1FTFW1E50PFA00000"]
name = "Test pickup"
final_drive = 3.67
tyre_diameter = 0.74

["1FTFW1E50PFA00000".forward_gear_ratios]
1 = 4.48
2 = 2.87
3 = 1.84

["C4HJ0000000000000"]
name = "Test jeep"

["C4HJ0000000000000".forward_gear_ratios]
1 = 4.0
2 = 2.0
"#;

const GEAR_THETAS: [f64; 3] = [0.25, 0.45, 0.65];

/// One route per gear, each an RPM sweep held in that gear with a dropout half
/// way through. The routes carry on in time from each other and end on a valid
/// sample so only the route boundary separates them.
fn write_routes(data_dir: &Path) {
    let mut rng = StdRng::seed_from_u64(7);
    let start = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
    let mut second = 0;
    for (idx, theta) in GEAR_THETAS.iter().enumerate() {
        let mut contents = String::from("iso_ts_pre,iso_ts_post,RPM,SPEED,THROTTLE_POS\n");
        for step in 0..60 {
            let pre = start + Duration::seconds(second);
            let post = pre + Duration::milliseconds(250);
            second += 1;
            if step == 30 {
                // logger dropout
                writeln!(contents, "{},{},,12.0,20",
                         pre.format("%Y-%m-%dT%H:%M:%S%.6f"), pre.format("%Y-%m-%dT%H:%M:%S%.6f")).unwrap();
            }
            let rpm = 1000.0 + 60.0 * step as f64;
            let jittered = theta + rng.gen_range(-0.006..0.006);
            let speed = (rpm / 60.0) * f64::tan(jittered) / 0.44704;
            writeln!(contents, "{},{},{:.1},{:.3},20",
                     pre.format("%Y-%m-%dT%H:%M:%S%.6f"), post.format("%Y-%m-%dT%H:%M:%S%.6f"),
                     rpm, speed).unwrap();
        }
        fs::write(data_dir.join(format!("route_{:02}_{}.csv", idx + 1, VIN)), contents).unwrap();
    }

    let mut idle = String::from("iso_ts_pre,iso_ts_post,RPM,SPEED\n");
    for step in 0..20 {
        let pre = start + Duration::seconds(step);
        writeln!(idle, "{},{},{},0", pre.format("%Y-%m-%dT%H:%M:%S%.6f"),
                 (pre + Duration::milliseconds(200)).format("%Y-%m-%dT%H:%M:%S%.6f"), 750 + step).unwrap();
    }
    fs::write(data_dir.join(format!("route_01_{}.csv", IDLE_VIN)), idle).unwrap();
}

fn study(dir: &Path, force: bool) -> GearStudy {
    let registry = VehicleRegistry::from_toml_str(VEHICLES).unwrap();
    let options = StudyOptions {
        kde: KdeSettings { bandwidth: Bandwidth::Fixed(0.02), ..KdeSettings::default() },
        force_recalibration: force,
        ..StudyOptions::default()
    };
    GearStudy::new(registry, CalibrationStore::new(&dir.join("calibration.json")), options)
}

#[test]
fn calibrate_then_classify() {
    let dir = tempfile::tempdir().unwrap();
    write_routes(dir.path());
    let study = study(dir.path(), false);

    let outcome = study.run_from_dir(dir.path(), VIN).unwrap();
    assert_eq!(outcome.records.len(), 183);
    let report = outcome.calibration.as_ref().unwrap();
    assert_eq!(report.expected_gears, 3);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let model = outcome.model.as_ref().unwrap();
    for (gear, theta) in (1..=3).zip(GEAR_THETAS) {
        assert!((model.theta(gear).unwrap() - theta).abs() < 0.01, "gear {} at {:?}", gear, model.theta(gear));
        assert!(model.get(gear).unwrap().a.is_some());
    }

    for record in &outcome.records {
        let f = &record.feature;
        match f.rpm {
            Some(_) => {
                assert_eq!(f.closest_gear, f.route);
                assert!(record.theta_error.unwrap().abs() < 0.02);
            }
            None => {
                assert_eq!(f.closest_gear, 0);
                assert_eq!(record.distance_error, None);
                assert_eq!(record.theta_error, None);
            }
        }
    }
    assert_eq!(outcome.diagnostics.len(), 3);
    assert!(outcome.diagnostics.iter().all(|d| d.samples == 60));

    let stored = study.store().load(VIN).unwrap();
    assert_eq!(&stored, model);
}

#[test]
fn route_boundaries_reset_acceleration() {
    let dir = tempfile::tempdir().unwrap();
    write_routes(dir.path());
    let outcome = study(dir.path(), false).run_from_dir(dir.path(), VIN).unwrap();

    for route in 1..=3 {
        let mut records = outcome.features().filter(|f| f.route == route);
        let first = records.next().unwrap();
        assert_eq!(first.acceleration, None);
        assert!(first.rpm.is_some());
        assert!(records.next().unwrap().acceleration.is_some());
    }
}

#[test]
fn without_usable_calibration_nothing_is_classified() {
    let dir = tempfile::tempdir().unwrap();
    write_routes(dir.path());
    let study = study(dir.path(), false);

    let outcome = study.run_from_dir(dir.path(), IDLE_VIN).unwrap();
    assert_eq!(outcome.records.len(), 20);
    assert!(outcome.model.is_none());
    for record in &outcome.records {
        assert_eq!(record.feature.closest_gear, 0);
        assert_eq!(record.distance_error, None);
        assert_eq!(record.theta_error, None);
    }
    assert!(study.store().load(IDLE_VIN).is_none());
}

#[test]
fn unknown_vehicle() {
    let dir = tempfile::tempdir().unwrap();
    let err = study(dir.path(), false).run_from_dir(dir.path(), "NOT-A-VIN").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NoSuchVehicle);
}

#[test]
fn repeated_runs_give_identical_output() {
    let dir = tempfile::tempdir().unwrap();
    write_routes(dir.path());
    let study = study(dir.path(), false);

    let first = study.run_from_dir(dir.path(), VIN).unwrap();
    assert!(first.calibration.is_some());
    let second = study.run_from_dir(dir.path(), VIN).unwrap();
    assert!(second.calibration.is_none());
    let third = study.run_from_dir(dir.path(), VIN).unwrap();

    let first_out = write_records(Vec::new(), &first.records).unwrap();
    let second_out = write_records(Vec::new(), &second.records).unwrap();
    let third_out = write_records(Vec::new(), &third.records).unwrap();
    assert_eq!(first_out, second_out);
    assert_eq!(second_out, third_out);

    let path = dir.path().join("out").join(output_file_name(VIN));
    export_to_path(&path, &third.records).unwrap();
    assert_eq!(fs::read(&path).unwrap(), third_out);
}
