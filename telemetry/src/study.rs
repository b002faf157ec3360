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


//! End to end gear study of one vehicle.
//!
//! Samples become feature records, the stored calibration is loaded (or a new
//! one is discovered from the eligible records and persisted), then every
//! record is classified and measured against its gear.

use std::path::Path;
use tracing::{info, warn};
use crate::calibration::{self, CalibrationReport, CalibrationStore, ThetaModel};
use crate::classifier::classify_records;
use crate::density::KdeSettings;
use crate::deviation::{estimate_errors, gear_error_diagnostics, ErrorRecord, GearErrorDiagnostics};
use crate::error::{ErrorKind, Result};
use crate::feature::{build_features, EligibilityLimits, FeatureRecord};
use crate::ingest;
use crate::sample::RawSample;
use crate::vehicle::{VehicleRegistry, VehicleSpec};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StudyOptions {
    pub limits: EligibilityLimits,
    pub kde: KdeSettings,
    /// Calibrate even when the store already holds a model for the vehicle
    pub force_recalibration: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StudyOutcome {
    pub vin: String,
    pub records: Vec<ErrorRecord>,
    /// `None` when no calibration exists and none could be discovered
    pub model: Option<ThetaModel>,
    /// Set when this run produced a fresh calibration
    pub calibration: Option<CalibrationReport>,
    pub diagnostics: Vec<GearErrorDiagnostics>,
}

impl StudyOutcome {
    pub fn features(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter().map(|r| &r.feature)
    }
}

#[derive(Debug)]
pub struct GearStudy {
    registry: VehicleRegistry,
    store: CalibrationStore,
    options: StudyOptions,
}

impl GearStudy {
    pub fn new(registry: VehicleRegistry, store: CalibrationStore, options: StudyOptions) -> GearStudy {
        GearStudy { registry, store, options }
    }

    pub fn registry(&self) -> &VehicleRegistry {
        &self.registry
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    pub fn options(&self) -> &StudyOptions {
        &self.options
    }

    /// Load every route of `vin` found in `data_dir` and study it
    pub fn run_from_dir(&self, data_dir: &Path, vin: &str) -> Result<StudyOutcome> {
        self.registry.get(vin)?;
        let routes = ingest::load_vehicle_routes(data_dir, vin)?;
        self.run(vin, &routes.samples)
    }

    pub fn run(&self, vin: &str, samples: &[RawSample]) -> Result<StudyOutcome> {
        let vehicle = self.registry.get(vin)?;
        let mut features = build_features(samples);

        let stored = match self.options.force_recalibration {
            true => None,
            false => self.store.load(vin)
        };
        let (model, calibration) = match stored {
            Some(model) => {
                info!("Using stored calibration for {}", vin);
                (Some(model), None)
            }
            None => match self.calibrate_features(vehicle, &features)? {
                Some(report) => (Some(report.model.clone()), Some(report)),
                None => (None, None)
            }
        };

        classify_records(&mut features, model.as_ref());
        let records = estimate_errors(features, model.as_ref());
        let diagnostics = match &model {
            Some(model) => gear_error_diagnostics(&records, model, &self.options.kde),
            None => Vec::new()
        };
        Ok(StudyOutcome { vin: vin.to_string(), records, model, calibration, diagnostics })
    }

    /// Discover and persist a fresh calibration for `vin` regardless of what is
    /// stored. `None` when the samples can't support one.
    pub fn calibrate(&self, vin: &str, samples: &[RawSample]) -> Result<Option<CalibrationReport>> {
        let vehicle = self.registry.get(vin)?;
        let features = build_features(samples);
        self.calibrate_features(vehicle, &features)
    }

    pub fn calibrate_from_dir(&self, data_dir: &Path, vin: &str) -> Result<Option<CalibrationReport>> {
        self.registry.get(vin)?;
        let routes = ingest::load_vehicle_routes(data_dir, vin)?;
        self.calibrate(vin, &routes.samples)
    }

    fn calibrate_features(&self,
                          vehicle: &VehicleSpec,
                          features: &[FeatureRecord]) -> Result<Option<CalibrationReport>> {
        match calibration::calibrate(vehicle, features, &self.options.limits, &self.options.kde) {
            Ok(report) => {
                self.store.upsert(&vehicle.vin, &report.model)?;
                Ok(Some(report))
            }
            Err(e) if e.kind() == ErrorKind::InsufficientData => {
                warn!("Can't calibrate {}, leaving every sample unclassified. {}", vehicle.vin, e.to_string());
                Ok(None)
            }
            Err(e) => Err(e)
        }
    }
}
