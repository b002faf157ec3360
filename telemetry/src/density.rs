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

//! One-dimensional Gaussian kernel density estimation and peak finding.
//!
//! The estimator is evaluated on an explicit, evenly spaced grid that extends
//! `cut` bandwidths past the data on each side. Peaks are strict local maxima
//! of that grid, endpoints excluded.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::Statistics;
use crate::error::{Error, ErrorKind, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bandwidth {
    /// `n^(-1/5) * std`
    Scott,
    /// `(3n/4)^(-1/5) * std`
    Silverman,
    Fixed(f64)
}

impl Bandwidth {
    pub const SCOTT: &'static str = "scott";
    pub const SILVERMAN: &'static str = "silverman";

    fn resolve(&self, samples: &[f64]) -> Result<f64> {
        let h = match self {
            Bandwidth::Fixed(h) => *h,
            Bandwidth::Scott | Bandwidth::Silverman => {
                if samples.len() < 2 {
                    return Err(Error::new(ErrorKind::InsufficientData,
                                          format!("{} samples is too few to choose a bandwidth", samples.len())));
                }
                let std_dev = samples.iter().std_dev();
                let n = samples.len() as f64;
                let factor = match self {
                    Bandwidth::Silverman => (n * 3.0 / 4.0).powf(-0.2),
                    _ => n.powf(-0.2)
                };
                factor * std_dev
            }
        };
        if !h.is_finite() || h <= 0.0 {
            return match self {
                Bandwidth::Fixed(_) => Err(Error::new(ErrorKind::ArgumentError,
                                                      format!("bandwidth must be a positive number, got {}", h))),
                _ => Err(Error::new(ErrorKind::InsufficientData,
                                    "samples have no spread to estimate a density from".to_string()))
            };
        }
        Ok(h)
    }
}

impl Default for Bandwidth {
    fn default() -> Self {
        Bandwidth::Scott
    }
}

impl Display for Bandwidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Bandwidth::Scott => write!(f, "{}", Bandwidth::SCOTT),
            Bandwidth::Silverman => write!(f, "{}", Bandwidth::SILVERMAN),
            Bandwidth::Fixed(h) => write!(f, "{}", h)
        }
    }
}

impl FromStr for Bandwidth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            Bandwidth::SCOTT => Ok(Bandwidth::Scott),
            Bandwidth::SILVERMAN => Ok(Bandwidth::Silverman),
            other => {
                match other.parse::<f64>() {
                    Ok(h) if h.is_finite() && h > 0.0 => Ok(Bandwidth::Fixed(h)),
                    _ => Err(Error::new(ErrorKind::ArgumentError,
                                        format!("'{}' is not a bandwidth. Expected scott, silverman or a positive number", s)))
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KdeSettings {
    pub bandwidth: Bandwidth,
    pub grid_points: usize,
    pub cut: f64,
}

impl KdeSettings {
    pub const DEFAULT_GRID_POINTS: usize = 200;
    pub const DEFAULT_CUT: f64 = 3.0;
}

impl Default for KdeSettings {
    fn default() -> Self {
        KdeSettings {
            bandwidth: Bandwidth::default(),
            grid_points: KdeSettings::DEFAULT_GRID_POINTS,
            cut: KdeSettings::DEFAULT_CUT
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DensityPeak {
    pub x: f64,
    pub density: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DensityCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl DensityCurve {
    pub fn local_maxima(&self) -> Vec<DensityPeak> {
        local_maxima(&self.x, &self.y)
    }
}

pub struct KernelDensity {
    samples: Vec<f64>,
    bandwidth: f64,
    kernel: Normal,
}

impl KernelDensity {
    /// Fit over the finite values in `samples`
    pub fn fit(samples: &[f64], bandwidth: Bandwidth) -> Result<KernelDensity> {
        let samples: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if samples.is_empty() {
            return Err(Error::new(ErrorKind::InsufficientData, "no samples to estimate a density from".to_string()));
        }
        let bandwidth = bandwidth.resolve(&samples)?;
        let kernel = Normal::new(0.0, 1.0).map_err(|e| {
            Error::new(ErrorKind::DensityError, e.to_string())
        })?;
        Ok(KernelDensity { samples, bandwidth, kernel })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn density_at(&self, x: f64) -> f64 {
        let sum: f64 = self.samples.iter()
            .map(|s| self.kernel.pdf((x - s) / self.bandwidth))
            .sum();
        sum / (self.samples.len() as f64 * self.bandwidth)
    }

    /// Evaluate on `grid_points` evenly spaced points covering the data plus
    /// `cut` bandwidths either side
    pub fn evaluate_grid(&self, grid_points: usize, cut: f64) -> DensityCurve {
        let min = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = min - cut * self.bandwidth;
        let high = max + cut * self.bandwidth;
        let x: Vec<f64> = match grid_points {
            0 => Vec::new(),
            1 => vec![(low + high) / 2.0],
            n => {
                let step = (high - low) / (n - 1) as f64;
                (0..n).map(|idx| low + step * idx as f64).collect()
            }
        };
        let y = x.iter().map(|v| self.density_at(*v)).collect();
        DensityCurve { x, y }
    }
}

/// Smoothed density of a set of values together with its peaks
#[derive(Clone, Debug, PartialEq)]
pub struct DensityEstimate {
    pub bandwidth: f64,
    pub curve: DensityCurve,
    pub peaks: Vec<DensityPeak>,
}

pub fn estimate(values: &[f64], settings: &KdeSettings) -> Result<DensityEstimate> {
    if settings.grid_points < 3 {
        return Err(Error::new(ErrorKind::ArgumentError,
                              format!("need at least 3 grid points to find maxima, got {}", settings.grid_points)));
    }
    if !settings.cut.is_finite() || settings.cut < 0.0 {
        return Err(Error::new(ErrorKind::ArgumentError,
                              format!("grid cut must be a non-negative number of bandwidths, got {}", settings.cut)));
    }
    let kde = KernelDensity::fit(values, settings.bandwidth)?;
    let curve = kde.evaluate_grid(settings.grid_points, settings.cut);
    let peaks = curve.local_maxima();
    Ok(DensityEstimate { bandwidth: kde.bandwidth(), curve, peaks })
}

/// Points strictly greater than both grid neighbours, in grid order
pub fn local_maxima(x: &[f64], y: &[f64]) -> Vec<DensityPeak> {
    let len = x.len().min(y.len());
    if len < 3 {
        return Vec::new();
    }
    (1..len - 1)
        .filter(|&idx| y[idx] > y[idx - 1] && y[idx] > y[idx + 1])
        .map(|idx| DensityPeak { x: x[idx], density: y[idx] })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use crate::density::{estimate, local_maxima, Bandwidth, KdeSettings, KernelDensity};
    use crate::error::ErrorKind;
    use crate::test_support::cluster;

    #[test]
    fn peaks_on_hand_made_curve() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let y = [5.0, 1.0, 3.0, 2.0, 2.0, 4.0, 4.0, 1.0];
        let peaks = local_maxima(&x, &y);
        // endpoint at 0 and the flat top at 5-6 are not strict maxima
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].x, 2.0);
        assert_eq!(peaks[0].density, 3.0);
        assert!(local_maxima(&x[..2], &y[..2]).is_empty());
    }

    #[test]
    fn scott_bandwidth() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let kde = KernelDensity::fit(&values, Bandwidth::Scott).unwrap();
        let expected = 5f64.powf(-0.2) * 2.5f64.sqrt();
        assert_relative_eq!(kde.bandwidth(), expected, epsilon = 1e-12);
        let silverman = KernelDensity::fit(&values, Bandwidth::Silverman).unwrap();
        assert_relative_eq!(silverman.bandwidth(), 3.75f64.powf(-0.2) * 2.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn density_integrates_to_one() {
        let values = cluster(0.5, 0.1, 200);
        let kde = KernelDensity::fit(&values, Bandwidth::Scott).unwrap();
        let curve = kde.evaluate_grid(2000, 5.0);
        let step = curve.x[1] - curve.x[0];
        let area: f64 = curve.y.iter().sum::<f64>() * step;
        assert_relative_eq!(area, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn two_clusters_give_two_peaks() {
        let mut values = cluster(0.30, 0.02, 500);
        values.extend(cluster(0.70, 0.02, 500));
        let estimate = estimate(&values, &KdeSettings::default()).unwrap();
        assert_eq!(estimate.curve.x.len(), 200);
        assert_eq!(estimate.peaks.len(), 2);
        assert!((estimate.peaks[0].x - 0.30).abs() < 0.01);
        assert!((estimate.peaks[1].x - 0.70).abs() < 0.01);
    }

    #[test]
    fn five_gear_fixture_with_fixed_bandwidth() {
        let truth = [0.2307, 0.4050, 0.5892, 0.7584, 0.8630];
        let mut values = Vec::new();
        for theta in truth {
            values.extend(cluster(theta, 0.01, 300));
        }
        let settings = KdeSettings { bandwidth: Bandwidth::Fixed(0.02), ..KdeSettings::default() };
        let estimate = estimate(&values, &settings).unwrap();
        assert_eq!(estimate.peaks.len(), truth.len());
        for (peak, theta) in estimate.peaks.iter().zip(truth) {
            assert!((peak.x - theta).abs() < 0.01, "peak {} far from {}", peak.x, theta);
        }
    }

    #[test]
    fn wide_bandwidth_merges_close_gears() {
        let mut values = cluster(0.76, 0.01, 300);
        values.extend(cluster(0.86, 0.01, 300));
        let settings = KdeSettings { bandwidth: Bandwidth::Fixed(0.08), ..KdeSettings::default() };
        assert_eq!(estimate(&values, &settings).unwrap().peaks.len(), 1);
    }

    #[test]
    fn unusable_input() {
        assert_eq!(KernelDensity::fit(&[], Bandwidth::Scott).err().unwrap().kind(), ErrorKind::InsufficientData);
        assert_eq!(KernelDensity::fit(&[0.4], Bandwidth::Scott).err().unwrap().kind(), ErrorKind::InsufficientData);
        assert_eq!(KernelDensity::fit(&[0.4, 0.4, 0.4], Bandwidth::Scott).err().unwrap().kind(), ErrorKind::InsufficientData);
        assert_eq!(KernelDensity::fit(&[0.4, 0.5], Bandwidth::Fixed(0.0)).err().unwrap().kind(), ErrorKind::ArgumentError);
        assert!(KernelDensity::fit(&[0.4], Bandwidth::Fixed(0.1)).is_ok());
        assert_eq!(KernelDensity::fit(&[f64::NAN, f64::NAN], Bandwidth::Scott).err().unwrap().kind(), ErrorKind::InsufficientData);
        let settings = KdeSettings { grid_points: 2, ..KdeSettings::default() };
        assert_eq!(estimate(&[0.1, 0.2], &settings).err().unwrap().kind(), ErrorKind::ArgumentError);
    }

    #[test]
    fn grid_cut_must_be_usable() {
        let values = [0.1, 0.2, 0.35];
        for cut in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let settings = KdeSettings { cut, ..KdeSettings::default() };
            assert_eq!(estimate(&values, &settings).err().unwrap().kind(), ErrorKind::ArgumentError, "cut {}", cut);
        }
        let settings = KdeSettings { cut: 0.0, ..KdeSettings::default() };
        let tight = estimate(&values, &settings).unwrap();
        assert_eq!(tight.curve.x.first().copied(), Some(0.1));
        assert_relative_eq!(tight.curve.x.last().copied().unwrap(), 0.35, epsilon = 1e-12);
    }

    #[test]
    fn bandwidth_parsing() {
        assert_eq!("scott".parse::<Bandwidth>().unwrap(), Bandwidth::Scott);
        assert_eq!(" Silverman ".parse::<Bandwidth>().unwrap(), Bandwidth::Silverman);
        assert_eq!("0.05".parse::<Bandwidth>().unwrap(), Bandwidth::Fixed(0.05));
        assert!("-1".parse::<Bandwidth>().is_err());
        assert!("wide".parse::<Bandwidth>().is_err());
        assert_eq!(Bandwidth::Fixed(0.05).to_string(), "0.05");
    }
}
