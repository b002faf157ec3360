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

/// Multiplier taking the logged SPEED column to meters per second.
/// The loggers record miles per hour, 1 mph == 0.44704 m/s exactly.
pub const SPEED_TO_MPS: f64 = 0.44704;

pub fn rpm_to_rps(rpm: f64) -> f64 {
    rpm / 60.0
}

pub fn speed_to_mps(speed: f64) -> f64 {
    speed * SPEED_TO_MPS
}

pub fn tyre_circumference(diameter_m: f64) -> f64 {
    std::f64::consts::PI * diameter_m
}
