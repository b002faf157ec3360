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

pub mod gearing;

pub use gearing::GearingCalculator;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use serde::Deserialize;
use tracing::{info, warn};
use crate::error::{Error, ErrorKind, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSpec {
    pub vin: String,
    pub name: String,
    pub transmission: Option<String>,
    pub forward_gear_ratios: BTreeMap<u32, f64>,
    pub final_drive: Option<f64>,
    /// Overall tyre diameter in meters
    pub tyre_diameter: Option<f64>,
}

impl VehicleSpec {
    pub fn new(vin: &str, name: &str, forward_gear_ratios: BTreeMap<u32, f64>) -> VehicleSpec {
        VehicleSpec {
            vin: vin.to_string(),
            name: name.to_string(),
            transmission: None,
            forward_gear_ratios,
            final_drive: None,
            tyre_diameter: None
        }
    }

    /// Number of forward gears, `N`
    pub fn gear_count(&self) -> usize {
        self.forward_gear_ratios.len()
    }

    pub fn gear_ratio(&self, gear: u32) -> Option<f64> {
        self.forward_gear_ratios.get(&gear).copied()
    }

    /// Forward gear numbers in ascending order
    pub fn gears(&self) -> Vec<u32> {
        self.forward_gear_ratios.keys().copied().collect()
    }
}

#[derive(Deserialize)]
struct VehicleEntry {
    name: String,
    #[serde(default)]
    transmission: Option<String>,
    forward_gear_ratios: BTreeMap<String, f64>,
    #[serde(default)]
    final_drive: Option<f64>,
    #[serde(default)]
    tyre_diameter: Option<f64>,
}

impl VehicleEntry {
    fn into_spec(self, vin: &str) -> Result<VehicleSpec> {
        let mut forward_gear_ratios = BTreeMap::new();
        for (gear, ratio) in self.forward_gear_ratios {
            let gear_number = match gear.trim().parse::<u32>() {
                Ok(g) if g > 0 => g,
                _ => return Err(Error::new(ErrorKind::TomlDecodeError,
                                           format!("{} has invalid gear number '{}'", vin, gear)))
            };
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(Error::new(ErrorKind::TomlDecodeError,
                                      format!("{} gear {} has invalid ratio {}", vin, gear_number, ratio)));
            }
            forward_gear_ratios.insert(gear_number, ratio);
        }
        Ok(VehicleSpec {
            vin: vin.to_string(),
            name: self.name,
            transmission: self.transmission,
            forward_gear_ratios,
            final_drive: self.final_drive,
            tyre_diameter: self.tyre_diameter
        })
    }
}

/// Static per-vehicle data keyed by VIN, read from a TOML document:
///
/// ```toml
/// ["1FTFW1E50PFA00000"]
/// name = "2023 Ford Maverick Lariat"
/// final_drive = 3.67
/// tyre_diameter = 0.74
///
/// ["1FTFW1E50PFA00000".forward_gear_ratios]
/// 1 = 4.48
/// 2 = 2.87
/// ```
#[derive(Clone, Debug, Default)]
pub struct VehicleRegistry {
    vehicles: BTreeMap<String, VehicleSpec>
}

impl VehicleRegistry {
    pub fn new() -> VehicleRegistry {
        VehicleRegistry::default()
    }

    pub fn load_from_path(path: &Path) -> Result<VehicleRegistry> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::new(ErrorKind::IOError, format!("Failed to read vehicle registry {}. {}", path.display(), e.to_string()))
        })?;
        let registry = VehicleRegistry::from_toml_str(&contents)?;
        match registry.is_empty() {
            true => warn!("Vehicle registry {} lists no vehicles", path.display()),
            false => info!("Loaded {} vehicles from {}", registry.len(), path.display())
        }
        Ok(registry)
    }

    pub fn from_toml_str(contents: &str) -> Result<VehicleRegistry> {
        let entries: BTreeMap<String, VehicleEntry> = toml::from_str(contents)?;
        let mut registry = VehicleRegistry::new();
        for (vin, entry) in entries {
            let spec = entry.into_spec(&vin)?;
            registry.insert(spec);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, spec: VehicleSpec) {
        self.vehicles.insert(spec.vin.clone(), spec);
    }

    pub fn get(&self, vin: &str) -> Result<&VehicleSpec> {
        self.vehicles.get(vin).ok_or_else(|| {
            Error::new(ErrorKind::NoSuchVehicle, format!("{} is not in the vehicle registry", vin))
        })
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}
