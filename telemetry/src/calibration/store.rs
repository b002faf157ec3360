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

//! Persisted gear calibrations.
//!
//! A single JSON document holds every vehicle:
//!
//! ```json
//! { "<vin>": { "1": {"theta": 0.2307, "a": 0.8432}, "2": {"theta": 0.4049, "a": 0.9387} } }
//! ```
//!
//! Writes replace a vehicle's entry wholesale and rewrite the whole document.
//! Entries are decoded one vehicle at a time, so a damaged entry only hides
//! that vehicle and is written back untouched when another vehicle is stored.
//! A document that isn't a JSON object at all is copied aside before it gets
//! replaced. Every read-modify-write in this process holds a lock keyed by the
//! document path for its full duration.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use chrono::Utc;
use tracing::{info, warn};
use crate::calibration::{GearCalibration, ThetaModel};
use crate::error::{Error, ErrorKind, Result};

/// VIN to the still encoded gear table of that vehicle
pub type CalibrationDocument = BTreeMap<String, serde_json::Value>;

enum DocumentState {
    Missing,
    Parsed(CalibrationDocument),
    Unreadable(String),
}

fn lexically_normalise(path: &Path) -> PathBuf {
    let mut normalised = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalised.pop() {
                    normalised.push(component);
                }
            }
            other => normalised.push(other)
        }
    }
    normalised
}

/// One key per file however it is spelt: absolute, without `.`/`..`, and with
/// the parent directory resolved when it exists
fn lock_key(path: &Path) -> PathBuf {
    let absolute = match path.is_absolute() {
        true => path.to_path_buf(),
        false => env::current_dir().map(|d| d.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    let normalised = lexically_normalise(&absolute);
    match (normalised.parent(), normalised.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent) {
            Ok(parent) => parent.join(name),
            Err(_) => normalised
        },
        _ => normalised
    }
}

fn document_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    locks.entry(lock_key(path)).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
}

#[derive(Clone, Debug)]
pub struct CalibrationStore {
    path: PathBuf
}

impl CalibrationStore {
    pub fn new(path: &Path) -> CalibrationStore {
        CalibrationStore { path: path.to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored model for `vin` with the gear 0 sentinel added. `None` when
    /// the document is missing or unreadable, or when the entry for `vin` is
    /// missing or damaged.
    pub fn load(&self, vin: &str) -> Option<ThetaModel> {
        let mut document = match self.read_document() {
            DocumentState::Parsed(document) => document,
            DocumentState::Missing => return None,
            DocumentState::Unreadable(reason) => {
                warn!("Calibration document {} is corrupt, ignoring it. {}", self.path.display(), reason);
                return None;
            }
        };
        let entry = match document.remove(vin) {
            Some(entry) => entry,
            None => {
                warn!("No calibration for {} in {}", vin, self.path.display());
                return None;
            }
        };
        match serde_json::from_value::<BTreeMap<u32, GearCalibration>>(entry) {
            Ok(gears) => Some(ThetaModel::from_gears(gears)),
            Err(e) => {
                warn!("Calibration for {} in {} is corrupt, ignoring it. {}", vin, self.path.display(), e.to_string());
                None
            }
        }
    }

    /// Replace the entry for `vin` with `model`. Gear 0 is never written and
    /// every other vehicle's entry is kept as it was.
    pub fn upsert(&self, vin: &str, model: &ThetaModel) -> Result<()> {
        let lock = document_lock(&self.path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut document = match self.read_document() {
            DocumentState::Parsed(document) => {
                info!("Rewriting calibration document {}", self.path.display());
                document
            }
            DocumentState::Missing => {
                info!("Creating calibration document {}", self.path.display());
                CalibrationDocument::new()
            }
            DocumentState::Unreadable(reason) => {
                let backup = self.set_aside()?;
                warn!("Calibration document {} is corrupt, copied it to {} before replacing it. {}",
                      self.path.display(), backup.display(), reason);
                CalibrationDocument::new()
            }
        };
        let entry = serde_json::to_value(model.persisted_gears()).map_err(|e| {
            Error::new(ErrorKind::JsonEncodeError, e.to_string())
        })?;
        document.insert(vin.to_string(), entry);

        let encoded = serde_json::to_vec_pretty(&document).map_err(|e| {
            Error::new(ErrorKind::JsonEncodeError, e.to_string())
        })?;
        utils::filesystem::write_file_atomic(&self.path, &encoded).map_err(|e| {
            Error::new(ErrorKind::PersistenceFailure,
                       format!("Failed to write {}. {}", self.path.display(), e.to_string()))
        })
    }

    /// Copy an unreadable document next to itself so replacing it loses nothing
    fn set_aside(&self) -> Result<PathBuf> {
        let mut backup_name = self.path.file_name().unwrap_or_default().to_os_string();
        backup_name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
        let backup = self.path.with_file_name(backup_name);
        fs::copy(&self.path, &backup).map_err(|e| {
            Error::new(ErrorKind::PersistenceFailure,
                       format!("Refusing to replace unreadable {}, couldn't copy it to {}. {}",
                               self.path.display(), backup.display(), e.to_string()))
        })?;
        Ok(backup)
    }

    fn read_document(&self) -> DocumentState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Calibration document {} not found", self.path.display());
                return DocumentState::Missing;
            }
            Err(e) => return DocumentState::Unreadable(e.to_string())
        };
        match serde_json::from_str::<CalibrationDocument>(&contents) {
            Ok(document) => DocumentState::Parsed(document),
            Err(e) => DocumentState::Unreadable(e.to_string())
        }
    }
}
