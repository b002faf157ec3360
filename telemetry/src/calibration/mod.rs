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

pub mod store;

pub use store::CalibrationStore;

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt::{Display, Formatter};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::density::{self, DensityPeak, KdeSettings};
use crate::error::Result;
use crate::feature::{EligibilityLimits, FeatureRecord};
use crate::vehicle::VehicleSpec;

/// Gear number reserved for samples that could not be matched to a gear
pub const UNCLASSIFIED_GEAR: u32 = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GearCalibration {
    pub theta: Option<f64>,
    pub a: Option<f64>,
}

impl GearCalibration {
    pub fn new(theta: Option<f64>, a: Option<f64>) -> GearCalibration {
        GearCalibration { theta, a }
    }

    pub fn unresolved() -> GearCalibration {
        GearCalibration { theta: None, a: None }
    }
}

/// Per-vehicle gear angles. Gear 0 is always present and always empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ThetaModel {
    gears: BTreeMap<u32, GearCalibration>
}

impl Default for ThetaModel {
    fn default() -> Self {
        ThetaModel::new()
    }
}

impl ThetaModel {
    pub fn new() -> ThetaModel {
        let mut gears = BTreeMap::new();
        gears.insert(UNCLASSIFIED_GEAR, GearCalibration::unresolved());
        ThetaModel { gears }
    }

    pub fn from_gears<I>(gears: I) -> ThetaModel
        where I: IntoIterator<Item = (u32, GearCalibration)>
    {
        let mut model = ThetaModel::new();
        for (gear, calibration) in gears {
            model.insert(gear, calibration);
        }
        model
    }

    /// Entries for gear 0 are ignored, the sentinel can't be overwritten
    pub fn insert(&mut self, gear: u32, calibration: GearCalibration) {
        if gear == UNCLASSIFIED_GEAR {
            return;
        }
        self.gears.insert(gear, calibration);
    }

    pub fn get(&self, gear: u32) -> Option<&GearCalibration> {
        self.gears.get(&gear)
    }

    pub fn theta(&self, gear: u32) -> Option<f64> {
        self.gears.get(&gear).and_then(|g| g.theta)
    }

    /// Every entry including the gear 0 sentinel, ascending by gear
    pub fn gears(&self) -> impl Iterator<Item = (u32, &GearCalibration)> {
        self.gears.iter().map(|(g, c)| (*g, c))
    }

    pub fn forward_gears(&self) -> impl Iterator<Item = (u32, &GearCalibration)> {
        self.gears().filter(|(g, _)| *g != UNCLASSIFIED_GEAR)
    }

    /// Forward gears with a usable angle, ascending by gear
    pub fn calibrated_thetas(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.forward_gears().filter_map(|(g, c)| {
            c.theta.filter(|t| t.is_finite()).map(|t| (g, t))
        })
    }

    pub fn has_calibrated_gears(&self) -> bool {
        self.calibrated_thetas().next().is_some()
    }

    pub fn forward_gear_count(&self) -> usize {
        self.forward_gears().count()
    }

    pub(crate) fn persisted_gears(&self) -> BTreeMap<u32, GearCalibration> {
        self.forward_gears().map(|(g, c)| (g, *c)).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CalibrationWarning {
    /// Fewer density peaks than forward gears, the top gears are left unresolved
    MissingGears { expected: usize, found: usize },
    /// More density peaks than forward gears, the weakest were dropped
    ExcessMaxima { expected: usize, found: usize, dropped: Vec<f64> },
}

impl Display for CalibrationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationWarning::MissingGears { expected, found } => {
                write!(f, "Expecting {} gears, got {} instead", expected, found)
            }
            CalibrationWarning::ExcessMaxima { expected, found, dropped } => {
                write!(f, "Expecting {} gears, got {} instead. Dropped weakest maxima at theta [{}]",
                       expected, found, dropped.iter().map(|t| format!("{:.4}", t)).join(", "))
            }
        }
    }
}

/// Outcome of a calibration run with everything needed to report on it
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationReport {
    pub vin: String,
    pub expected_gears: usize,
    pub eligible_samples: usize,
    pub bandwidth: f64,
    /// Every strict maximum found, ascending by theta
    pub peaks: Vec<DensityPeak>,
    pub model: ThetaModel,
    pub warnings: Vec<CalibrationWarning>,
}

/// Keep at most `gear_count` peaks. When there are too many the ones with the
/// lowest density go. Returns (kept ascending by theta, dropped ascending by theta).
pub fn select_gear_peaks(peaks: &[DensityPeak], gear_count: usize) -> (Vec<DensityPeak>, Vec<DensityPeak>) {
    let ascending: Vec<DensityPeak> = peaks.iter().copied()
        .sorted_by(|a, b| a.x.total_cmp(&b.x))
        .collect();
    if ascending.len() <= gear_count {
        return (ascending, Vec::new());
    }
    let strongest: Vec<usize> = (0..ascending.len())
        .sorted_by(|a, b| {
            ascending[*b].density.total_cmp(&ascending[*a].density).then(a.cmp(b))
        })
        .take(gear_count)
        .sorted()
        .collect();
    let (kept, dropped): (Vec<(usize, DensityPeak)>, Vec<(usize, DensityPeak)>) = ascending.into_iter()
        .enumerate()
        .partition(|(idx, _)| strongest.contains(idx));
    (kept.into_iter().map(|(_, p)| p).collect(), dropped.into_iter().map(|(_, p)| p).collect())
}

/// Pair peaks with the vehicle's gear numbers, both ascending. Gears without
/// a peak get empty entries. `a = nominal_ratio * tan(theta)`.
pub fn build_model(vehicle: &VehicleSpec, peaks: &[DensityPeak]) -> ThetaModel {
    let mut model = ThetaModel::new();
    let mut peak_iter = peaks.iter();
    for gear in vehicle.gears() {
        let calibration = match peak_iter.next() {
            Some(peak) => {
                let a = vehicle.gear_ratio(gear).map(|ratio| ratio * peak.x.tan());
                GearCalibration::new(Some(peak.x), a)
            }
            None => GearCalibration::unresolved()
        };
        model.insert(gear, calibration);
    }
    model
}

/// Theta values usable for gear discovery: finite and within [0, PI]
pub fn calibration_thetas(records: &[FeatureRecord], limits: &EligibilityLimits) -> Vec<f64> {
    limits.eligible(records)
        .iter()
        .filter_map(|r| r.theta)
        .filter(|t| t.is_finite() && (0.0..=PI).contains(t))
        .collect()
}

/// Discover the gear angles of `vehicle` from its feature records
pub fn calibrate(vehicle: &VehicleSpec,
                 records: &[FeatureRecord],
                 limits: &EligibilityLimits,
                 settings: &KdeSettings) -> Result<CalibrationReport> {
    let thetas = calibration_thetas(records, limits);
    info!("{} calibrating from {} eligible of {} samples", vehicle.name, thetas.len(), records.len());
    let estimate = density::estimate(&thetas, settings)?;

    let expected = vehicle.gear_count();
    let found = estimate.peaks.len();
    let (kept, dropped) = select_gear_peaks(&estimate.peaks, expected);
    let mut warnings = Vec::new();
    if found < expected {
        warnings.push(CalibrationWarning::MissingGears { expected, found });
    } else if !dropped.is_empty() {
        warnings.push(CalibrationWarning::ExcessMaxima {
            expected,
            found,
            dropped: dropped.iter().map(|p| p.x).collect()
        });
    }
    for warning in &warnings {
        warn!("{} {}", vehicle.name, warning);
    }

    let model = build_model(vehicle, &kept);
    Ok(CalibrationReport {
        vin: vehicle.vin.clone(),
        expected_gears: expected,
        eligible_samples: thetas.len(),
        bandwidth: estimate.bandwidth,
        peaks: estimate.peaks,
        model,
        warnings
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use approx::assert_relative_eq;
    use crate::calibration::{build_model, calibrate, select_gear_peaks, CalibrationWarning, GearCalibration, ThetaModel, UNCLASSIFIED_GEAR};
    use crate::density::{Bandwidth, DensityPeak, KdeSettings};
    use crate::error::ErrorKind;
    use crate::feature::{build_features, EligibilityLimits};
    use crate::sample::RawSample;
    use crate::test_support::{cluster, rpm_speed_on_line, sample_at};
    use crate::vehicle::VehicleSpec;

    fn vehicle(gears: usize) -> VehicleSpec {
        let ratios: BTreeMap<u32, f64> = [3.59, 2.19, 1.41, 1.00, 0.83, 0.70].iter()
            .take(gears)
            .enumerate()
            .map(|(idx, r)| (idx as u32 + 1, *r))
            .collect();
        VehicleSpec::new("TESTVIN", "Test vehicle", ratios)
    }

    fn peak(x: f64, density: f64) -> DensityPeak {
        DensityPeak { x, density }
    }

    /// Accelerating samples whose thetas follow `clusters`. Every sample gets
    /// its own route so each pair (still, moving) yields one eligible record.
    fn accelerating_samples(thetas: &[f64]) -> Vec<RawSample> {
        let mut samples = Vec::new();
        for (idx, theta) in thetas.iter().enumerate() {
            let route = idx as u32 + 1;
            let (rpm, speed) = rpm_speed_on_line(2000.0, *theta);
            samples.push(sample_at(2 * idx as i64, Some(rpm), Some(0.0), route));
            samples.push(sample_at(2 * idx as i64 + 1, Some(rpm), Some(speed), route));
        }
        samples
    }

    #[test]
    fn sentinel_always_present() {
        let mut model = ThetaModel::new();
        assert_eq!(model.get(UNCLASSIFIED_GEAR), Some(&GearCalibration::unresolved()));
        model.insert(0, GearCalibration::new(Some(1.0), Some(1.0)));
        assert_eq!(model.theta(0), None);
        assert!(!model.has_calibrated_gears());
        model.insert(1, GearCalibration::new(Some(0.3), None));
        assert!(model.has_calibrated_gears());
        assert_eq!(model.forward_gear_count(), 1);
        assert!(!model.persisted_gears().contains_key(&0));
    }

    #[test]
    fn keeps_everything_when_not_too_many() {
        let (kept, dropped) = select_gear_peaks(&[peak(0.7, 1.0), peak(0.3, 2.0)], 3);
        assert_eq!(kept, vec![peak(0.3, 2.0), peak(0.7, 1.0)]);
        assert!(dropped.is_empty());
    }

    #[test]
    fn drops_weakest_excess_maxima() {
        let peaks = [peak(0.2, 5.0), peak(0.25, 0.4), peak(0.4, 4.0), peak(0.6, 3.0), peak(0.9, 0.2)];
        let (kept, dropped) = select_gear_peaks(&peaks, 3);
        assert_eq!(kept.iter().map(|p| p.x).collect::<Vec<_>>(), vec![0.2, 0.4, 0.6]);
        assert_eq!(dropped.iter().map(|p| p.x).collect::<Vec<_>>(), vec![0.25, 0.9]);
    }

    #[test]
    fn model_pads_missing_high_gears() {
        let spec = vehicle(5);
        let model = build_model(&spec, &[peak(0.23, 1.0), peak(0.40, 1.0), peak(0.59, 1.0)]);
        assert_eq!(model.forward_gear_count(), 5);
        assert_eq!(model.theta(3), Some(0.59));
        assert_eq!(model.get(4), Some(&GearCalibration::unresolved()));
        assert_eq!(model.get(5), Some(&GearCalibration::unresolved()));
        assert_relative_eq!(model.get(1).unwrap().a.unwrap(), 3.59 * 0.23f64.tan());
    }

    #[test]
    fn model_follows_registry_gear_numbers() {
        let ratios = BTreeMap::from([(1, 3.59), (2, 2.19), (4, 1.00)]);
        let spec = VehicleSpec::new("TESTVIN", "Gapped gearbox", ratios);
        let model = build_model(&spec, &[peak(0.23, 1.0), peak(0.40, 1.0), peak(0.76, 1.0)]);
        assert_eq!(model.forward_gear_count(), 3);
        assert_eq!(model.theta(1), Some(0.23));
        assert_eq!(model.theta(2), Some(0.40));
        assert_eq!(model.theta(3), None);
        assert_eq!(model.theta(4), Some(0.76));
        assert_relative_eq!(model.get(4).unwrap().a.unwrap(), 0.76f64.tan());
    }

    #[test]
    fn calibrate_finds_every_gear() {
        let truth = [0.25, 0.45, 0.65];
        let mut thetas = Vec::new();
        for theta in truth {
            thetas.extend(cluster(theta, 0.01, 80));
        }
        let records = build_features(&accelerating_samples(&thetas));
        let settings = KdeSettings { bandwidth: Bandwidth::Fixed(0.02), ..KdeSettings::default() };
        let report = calibrate(&vehicle(3), &records, &EligibilityLimits::default(), &settings).unwrap();
        assert_eq!(report.eligible_samples, 240);
        assert!(report.warnings.is_empty());
        for (gear, theta) in (1..=3).zip(truth) {
            assert!((report.model.theta(gear).unwrap() - theta).abs() < 0.01);
        }
    }

    #[test]
    fn calibrate_warns_about_missing_gears() {
        let mut thetas = cluster(0.25, 0.01, 80);
        thetas.extend(cluster(0.45, 0.01, 80));
        let records = build_features(&accelerating_samples(&thetas));
        let settings = KdeSettings { bandwidth: Bandwidth::Fixed(0.02), ..KdeSettings::default() };
        let report = calibrate(&vehicle(4), &records, &EligibilityLimits::default(), &settings).unwrap();
        assert_eq!(report.warnings, vec![CalibrationWarning::MissingGears { expected: 4, found: 2 }]);
        assert_eq!(report.model.theta(3), None);
        assert_eq!(report.model.theta(4), None);
    }

    #[test]
    fn calibrate_warns_about_excess_maxima() {
        let mut thetas = cluster(0.25, 0.01, 100);
        thetas.extend(cluster(0.45, 0.01, 100));
        thetas.extend(cluster(0.65, 0.01, 20));
        let records = build_features(&accelerating_samples(&thetas));
        let settings = KdeSettings { bandwidth: Bandwidth::Fixed(0.02), ..KdeSettings::default() };
        let report = calibrate(&vehicle(2), &records, &EligibilityLimits::default(), &settings).unwrap();
        assert_eq!(report.peaks.len(), 3);
        match &report.warnings[..] {
            [CalibrationWarning::ExcessMaxima { expected: 2, found: 3, dropped }] => {
                assert_eq!(dropped.len(), 1);
                assert!((dropped[0] - 0.65).abs() < 0.01);
            }
            other => panic!("unexpected warnings {:?}", other)
        }
        assert!((report.model.theta(2).unwrap() - 0.45).abs() < 0.01);
    }

    #[test]
    fn calibrate_without_data() {
        let err = calibrate(&vehicle(3), &[], &EligibilityLimits::default(), &KdeSettings::default()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }
}
