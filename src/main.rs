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


mod report;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use telemetry::calibration::CalibrationStore;
use telemetry::deviation;
use telemetry::export;
use telemetry::summary;
use telemetry::vehicle::VehicleRegistry;
use telemetry::{GearStudy, StudyOptions};
use crate::settings::Settings;

#[derive(thiserror::Error, Debug)]
pub enum StudyError {
    #[error("settings error. {0}")]
    SettingsError(#[from] config::ConfigError),
    #[error("{0}")]
    TelemetryError(#[from] telemetry::Error),
    #[error("no calibration stored for {0}")]
    NoCalibration(String),
}

#[derive(Parser, Debug)]
#[command(name = "gear-study")]
#[command(about = "Discover per-gear calibrations from RPM/speed telemetry and label every sample with its gear", long_about = None)]
struct Cli {
    /// Directory holding the route CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for the labeled output and the log file
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Calibration JSON document
    #[arg(long, global = true)]
    calibration_file: Option<PathBuf>,

    /// Vehicle registry TOML document
    #[arg(long, global = true)]
    vehicles_file: Option<PathBuf>,

    /// KDE bandwidth: scott, silverman or a fixed positive number
    #[arg(long, global = true)]
    bandwidth: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover a fresh calibration for a vehicle and store it
    Calibrate {
        #[arg(long)]
        vin: String,
    },
    /// Label every sample of a vehicle with its gear and export the result
    Classify {
        #[arg(long)]
        vin: String,

        /// Ignore any stored calibration
        #[arg(long, default_value_t = false)]
        recalibrate: bool,

        /// Also break theta_error down across the range of this output column
        #[arg(long)]
        range_column: Option<String>,
    },
    /// Print the stored calibration of a vehicle
    Show {
        #[arg(long)]
        vin: String,
    },
}

const LOG_FILE_NAME: &str = "gear_study.log";

fn log_file_appender(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)
}

fn init_logging(log_dir: &Path) {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to init logging. Couldn't create {}. {}", log_dir.display(), e.to_string());
        return;
    }
    let file_appender = match log_file_appender(log_dir) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to init logging. Couldn't open {} in {}. {}",
                      LOG_FILE_NAME, log_dir.display(), e.to_string());
            return;
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_appender)
        .with_ansi(false)
        .compact()
        .finish();
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(_) => {
            info!("Logging initialised");
        }
        Err(e) => {
            eprintln!("Failed to init logging. {}", e.to_string());
        }
    }
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(path) = &cli.data_dir {
        settings.set_data_dir(path);
    }
    if let Some(path) = &cli.output_dir {
        settings.set_output_dir(path);
    }
    if let Some(path) = &cli.calibration_file {
        settings.set_calibration_file(path);
    }
    if let Some(path) = &cli.vehicles_file {
        settings.set_vehicles_file(path);
    }
    if let Some(bandwidth) = &cli.bandwidth {
        settings.set_bandwidth(bandwidth);
    }
}

fn build_study(settings: &Settings, force_recalibration: bool) -> Result<GearStudy, StudyError> {
    let registry = VehicleRegistry::load_from_path(&settings.vehicles_file())?;
    let options = StudyOptions {
        kde: settings.kde_settings()?,
        force_recalibration: force_recalibration || settings.force_recalibration(),
        ..StudyOptions::default()
    };
    Ok(GearStudy::new(registry, CalibrationStore::new(&settings.calibration_file()), options))
}

fn calibrate(settings: &Settings, vin: &str) -> Result<(), StudyError> {
    let study = build_study(settings, true)?;
    match study.calibrate_from_dir(&settings.data_dir(), vin)? {
        Some(calibration) => {
            report::print_calibration_report(&calibration, study.registry().get(vin).ok());
        }
        None => {
            println!("Not enough eligible samples to calibrate {}", vin);
        }
    }
    Ok(())
}

fn classify(settings: &Settings,
            vin: &str,
            recalibrate: bool,
            range_column: Option<&str>) -> Result<(), StudyError> {
    let study = build_study(settings, recalibrate)?;
    let outcome = study.run_from_dir(&settings.data_dir(), vin)?;
    let vehicle = study.registry().get(vin).ok();

    if let Some(calibration) = &outcome.calibration {
        report::print_calibration_report(calibration, vehicle);
    } else if let Some(model) = &outcome.model {
        report::print_model(vin, model, vehicle);
    } else {
        println!("No calibration for {}, every sample is unclassified", vin);
    }

    let output_path = settings.output_dir().join(export::output_file_name(vin));
    export::export_to_path(&output_path, &outcome.records)?;
    println!("\n{} samples written to {}", outcome.records.len(), output_path.display());

    println!();
    report::print_route_summaries(&summary::route_summaries(outcome.features()));
    println!();
    report::print_gear_counts(&summary::gear_counts(outcome.features()));
    println!();
    report::print_column_statistics(&summary::basic_statistics(&outcome.records));
    if !outcome.diagnostics.is_empty() {
        println!();
        report::print_error_diagnostics(&outcome.diagnostics);
    }
    if let Some(column) = range_column {
        println!();
        report::print_column_range_study(&deviation::column_range_study(&outcome.records, column)?);
    }
    Ok(())
}

fn show(settings: &Settings, vin: &str) -> Result<(), StudyError> {
    let store = CalibrationStore::new(&settings.calibration_file());
    let model = store.load(vin).ok_or_else(|| StudyError::NoCalibration(vin.to_string()))?;
    let registry = match VehicleRegistry::load_from_path(&settings.vehicles_file()) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Showing {} without vehicle details. {}", vin, e.to_string());
            VehicleRegistry::new()
        }
    };
    report::print_model(vin, &model, registry.get(vin).ok());
    Ok(())
}

fn main() -> Result<(), StudyError> {
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    apply_overrides(&mut settings, &cli);
    init_logging(&settings.output_dir());
    for warning in settings.load_warnings() {
        warn!("{}", warning);
    }

    let result = match &cli.command {
        Command::Calibrate { vin } => calibrate(&settings, vin),
        Command::Classify { vin, recalibrate, range_column } => {
            classify(&settings, vin, *recalibrate, range_column.as_deref())
        }
        Command::Show { vin } => show(&settings, vin),
    };
    if let Err(e) = &result {
        error!("{}", e.to_string());
    }
    result
}
