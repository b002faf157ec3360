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
use utils::units::tyre_circumference;
use crate::vehicle::VehicleSpec;

/// Nominal drivetrain geometry of a vehicle. Used to predict where each gear
/// line should sit so discovered calibrations can be sanity checked.
pub struct GearingCalculator {
    gear_ratios: BTreeMap<u32, f64>,
    final_drive: f64,
    tyre_circumference: f64,
}

impl GearingCalculator {
    /// `None` unless the vehicle has both a final drive ratio and a tyre diameter
    pub fn from_vehicle(vehicle: &VehicleSpec) -> Option<GearingCalculator> {
        let final_drive = vehicle.final_drive.filter(|f| f.is_finite() && *f > 0.0)?;
        let diameter = vehicle.tyre_diameter.filter(|d| d.is_finite() && *d > 0.0)?;
        Some(GearingCalculator::new(vehicle.forward_gear_ratios.clone(), final_drive, diameter))
    }

    pub fn new(gear_ratios: BTreeMap<u32, f64>, final_drive: f64, tyre_diameter: f64) -> GearingCalculator {
        GearingCalculator { gear_ratios, final_drive, tyre_circumference: tyre_circumference(tyre_diameter) }
    }

    /// Angle of the gear line in (rev/s, m/s) space: meters travelled per
    /// engine revolution is `circumference / (ratio * final_drive)`
    pub fn nominal_theta(&self, gear: u32) -> Option<f64> {
        let ratio = self.gear_ratios.get(&gear)?;
        let meters_per_rev = self.tyre_circumference / (ratio * self.final_drive);
        Some(meters_per_rev.atan2(1.0))
    }
}
