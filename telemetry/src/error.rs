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

use std::{error, fmt, io, result};
use std::fmt::{Display, Formatter};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error{
    kind: ErrorKind,
    details: String
}

impl Error {
    pub fn new(kind: ErrorKind, details: String) -> Error {
        Error{ kind, details }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn details(&self) -> &str {
        &self.details
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.kind.as_str(), self.details)
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::new(ErrorKind::IOError, format!("{}. {}", e.to_string(), e.kind().to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            return Error::new(ErrorKind::IOError, e.to_string());
        }
        Error::new(ErrorKind::JsonDecodeError, e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::new(ErrorKind::TomlDecodeError, e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            return Error::new(ErrorKind::IOError, e.to_string());
        }
        Error::new(ErrorKind::CsvError, e.to_string())
    }
}


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    IOError,
    JsonDecodeError,
    JsonEncodeError,
    TomlDecodeError,
    CsvError,
    InsufficientData,
    DensityError,
    NoSuchVehicle,
    PersistenceFailure,
    ArgumentError
}

impl ErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::IOError => "io error",
            ErrorKind::JsonDecodeError => "json decode error",
            ErrorKind::JsonEncodeError => "json encode error",
            ErrorKind::TomlDecodeError => "toml decode error",
            ErrorKind::CsvError => "csv error",
            ErrorKind::InsufficientData => "insufficient data",
            ErrorKind::DensityError => "density estimation error",
            ErrorKind::NoSuchVehicle => "vehicle doesn't exist",
            ErrorKind::PersistenceFailure => "failed to persist calibration",
            ErrorKind::ArgumentError => "argument error"
        }
    }
}
