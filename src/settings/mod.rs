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


use std::fs;
use std::path::{Path, PathBuf};
use config::{Config, ConfigBuilder, ConfigError};
use config::builder::DefaultState;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use telemetry::density::{Bandwidth, KdeSettings};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    data_dir: String,
    output_dir: String,
    calibration_file: String,
    vehicles_file: String,
    bandwidth: String,
    grid_points: usize,
    cut: f64,
    force_recalibration: bool,
    #[serde(skip)]
    load_warnings: Vec<String>,
}

impl Settings {
    const DATA_DIR: &'static str = "data_dir";
    const OUTPUT_DIR: &'static str = "output_dir";
    const CALIBRATION_FILE: &'static str = "calibration_file";
    const VEHICLES_FILE: &'static str = "vehicles_file";
    const BANDWIDTH: &'static str = "bandwidth";
    const GRID_POINTS: &'static str = "grid_points";
    const CUT: &'static str = "cut";
    const FORCE_RECALIBRATION: &'static str = "force_recalibration";
    const CONFIG_FILENAME: &'static str = "gear-study-conf";
    const ENV_PREFIX: &'static str = "GEAR_STUDY";

    pub fn default() -> Self {
        Settings {
            data_dir: default_data_dir().join("routes").to_string_lossy().into_owned(),
            output_dir: default_data_dir().join("output").to_string_lossy().into_owned(),
            calibration_file: default_data_dir().join("calibration.json").to_string_lossy().into_owned(),
            vehicles_file: default_config_dir().join("vehicles.toml").to_string_lossy().into_owned(),
            bandwidth: Bandwidth::default().to_string(),
            grid_points: KdeSettings::DEFAULT_GRID_POINTS,
            cut: KdeSettings::DEFAULT_CUT,
            force_recalibration: false,
            load_warnings: Vec::new()
        }
    }

    fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Settings::default();
        builder
            .set_default(Settings::DATA_DIR, defaults.data_dir)?
            .set_default(Settings::OUTPUT_DIR, defaults.output_dir)?
            .set_default(Settings::CALIBRATION_FILE, defaults.calibration_file)?
            .set_default(Settings::VEHICLES_FILE, defaults.vehicles_file)?
            .set_default(Settings::BANDWIDTH, defaults.bandwidth)?
            .set_default(Settings::GRID_POINTS, defaults.grid_points as u64)?
            .set_default(Settings::CUT, defaults.cut)?
            .set_default(Settings::FORCE_RECALIBRATION, defaults.force_recalibration)
    }

    /// Defaults, overridden by `gear-study-conf.toml` and then by `GEAR_STUDY_*`
    /// environment variables. A missing or unreadable config file is replaced
    /// by one holding the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Settings::load_from(Settings::CONFIG_FILENAME)
    }

    /// [`Settings::load`] from `config_name`, the config file path without its
    /// `.toml` extension. Logging isn't running yet at this point so anything
    /// worth reporting is kept in [`Settings::load_warnings`].
    pub fn load_from(config_name: &str) -> Result<Self, ConfigError> {
        return match Settings::with_defaults(Config::builder())?
            .add_source(config::File::with_name(config_name))
            .add_source(config::Environment::with_prefix(Settings::ENV_PREFIX))
            .build() {
            Ok(settings) => {
                settings.try_deserialize()
            }
            Err(e) => {
                let settings = Settings::with_defaults(Config::builder())?
                    .add_source(config::Environment::with_prefix(Settings::ENV_PREFIX))
                    .build()?;
                let mut ret: Settings = settings.try_deserialize()?;
                ret.load_warnings.push(format!("Failed to load settings. {}", e.to_string()));
                if let Err(e) = Settings::default().write(config_name) {
                    ret.load_warnings.push(format!("Failed to write settings. {}", e.to_string()));
                }
                Ok(ret)
            }
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn set_data_dir(&mut self, new_path: &Path) {
        self.data_dir = new_path.to_string_lossy().into_owned();
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn set_output_dir(&mut self, new_path: &Path) {
        self.output_dir = new_path.to_string_lossy().into_owned();
    }

    pub fn calibration_file(&self) -> PathBuf {
        PathBuf::from(&self.calibration_file)
    }

    pub fn set_calibration_file(&mut self, new_path: &Path) {
        self.calibration_file = new_path.to_string_lossy().into_owned();
    }

    pub fn vehicles_file(&self) -> PathBuf {
        PathBuf::from(&self.vehicles_file)
    }

    pub fn set_vehicles_file(&mut self, new_path: &Path) {
        self.vehicles_file = new_path.to_string_lossy().into_owned();
    }

    pub fn set_bandwidth(&mut self, bandwidth: &str) {
        self.bandwidth = bandwidth.to_string();
    }

    pub fn force_recalibration(&self) -> bool {
        self.force_recalibration
    }

    pub fn kde_settings(&self) -> telemetry::Result<KdeSettings> {
        Ok(KdeSettings {
            bandwidth: self.bandwidth.parse::<Bandwidth>()?,
            grid_points: self.grid_points,
            cut: self.cut
        })
    }

    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    pub fn write(&self, config_name: &str) -> std::io::Result<()> {
        fs::write(format!("{}.toml", config_name), toml::to_string(&self).map_err(|_e|{
            std::io::Error::new(std::io::ErrorKind::Other, "Failed to encode settings to toml")
        })?)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "zephyrj", "gear-study")
}

fn default_data_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from(".")
    }
}

fn default_config_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => PathBuf::from(".")
    }
}
