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


pub mod calibration;
pub mod classifier;
pub mod density;
pub mod deviation;
pub mod error;
pub mod export;
pub mod feature;
pub mod ingest;
pub mod sample;
pub mod study;
pub mod summary;
pub mod vehicle;
#[cfg(test)]
mod test_support;

pub use error::{Error, ErrorKind, Result};
pub use study::{GearStudy, StudyOptions, StudyOutcome};
