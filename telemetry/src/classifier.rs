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

use tracing::warn;
use crate::calibration::{ThetaModel, UNCLASSIFIED_GEAR};
use crate::feature::FeatureRecord;

/// The calibrated gear whose angle is nearest to `theta`.
///
/// Returns [`UNCLASSIFIED_GEAR`] when there is no usable theta or nothing in
/// the model to compare against. Equal distances go to the lower gear.
pub fn classify(theta: Option<f64>, model: &ThetaModel) -> u32 {
    let theta = match theta {
        Some(t) if t.is_finite() => t,
        _ => return UNCLASSIFIED_GEAR
    };
    model.calibrated_thetas()
        .map(|(gear, gear_theta)| (gear, (gear_theta - theta).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(gear, _)| gear)
        .unwrap_or(UNCLASSIFIED_GEAR)
}

/// Set `closest_gear` on every record. Without a model everything is gear 0.
pub fn classify_records(records: &mut [FeatureRecord], model: Option<&ThetaModel>) {
    match model {
        Some(model) => {
            if !model.has_calibrated_gears() {
                warn!("Calibration has no usable gears, every sample is unclassified");
            }
            for record in records.iter_mut() {
                record.closest_gear = classify(record.theta, model);
            }
        }
        None => {
            for record in records.iter_mut() {
                record.closest_gear = UNCLASSIFIED_GEAR;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use crate::calibration::{GearCalibration, ThetaModel, UNCLASSIFIED_GEAR};
    use crate::classifier::{classify, classify_records};
    use crate::feature::build_features;
    use crate::test_support::sample_at;

    fn model(thetas: &[(u32, Option<f64>)]) -> ThetaModel {
        ThetaModel::from_gears(thetas.iter().map(|(g, t)| (*g, GearCalibration::new(*t, None))))
    }

    fn brute_force(theta: f64, model: &ThetaModel) -> u32 {
        let mut best_gear = UNCLASSIFIED_GEAR;
        let mut best_distance = f64::INFINITY;
        for (gear, calibration) in model.gears() {
            if let Some(gear_theta) = calibration.theta {
                let distance = (gear_theta - theta).abs();
                if distance < best_distance {
                    best_distance = distance;
                    best_gear = gear;
                }
            }
        }
        best_gear
    }

    #[test]
    fn nearest_gear() {
        let m = model(&[(1, Some(0.30)), (2, Some(0.70))]);
        assert_eq!(classify(Some(4.0f64.atan2(10.0)), &m), 1);
        assert_eq!(classify(Some(0.6), &m), 2);
        assert_eq!(classify(Some(-3.0), &m), 1);
        assert_eq!(classify(Some(3.0), &m), 2);
    }

    #[test]
    fn unclassifiable() {
        let m = model(&[(1, Some(0.30)), (2, Some(0.70))]);
        assert_eq!(classify(None, &m), UNCLASSIFIED_GEAR);
        assert_eq!(classify(Some(f64::NAN), &m), UNCLASSIFIED_GEAR);
        assert_eq!(classify(Some(0.3), &ThetaModel::new()), UNCLASSIFIED_GEAR);
        assert_eq!(classify(Some(0.3), &model(&[(1, None), (2, None)])), UNCLASSIFIED_GEAR);
    }

    #[test]
    fn ties_go_to_lower_gear() {
        let m = model(&[(1, Some(0.25)), (2, Some(0.75))]);
        assert_eq!(classify(Some(0.5), &m), 1);
        let same = model(&[(3, Some(0.4)), (2, Some(0.4))]);
        assert_eq!(classify(Some(0.1), &same), 2);
    }

    #[test]
    fn skips_unresolved_gears() {
        let m = model(&[(1, Some(0.30)), (2, None), (3, Some(0.70))]);
        assert_eq!(classify(Some(0.45), &m), 1);
        assert_eq!(classify(Some(0.55), &m), 3);
    }

    #[test]
    fn non_monotonic_gear_angles() {
        // distances to gears 1..4 for 0.31 are 0.01, 0.39, 0.04, 0.02
        let m = model(&[(1, Some(0.30)), (2, Some(0.70)), (3, Some(0.35)), (4, Some(0.29))]);
        assert_eq!(classify(Some(0.31), &m), 1);
        assert_eq!(classify(Some(0.285), &m), 4);
        assert_eq!(classify(Some(0.36), &m), 3);
    }

    #[test]
    fn matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(0xc1a5);
        let fixed = model(&[(1, Some(0.30)), (2, Some(0.70))]);
        for _ in 0..1000 {
            let theta: f64 = rng.gen_range(-1.0..2.5);
            assert_eq!(classify(Some(theta), &fixed), brute_force(theta, &fixed));
        }
        for _ in 0..500 {
            let gear_count = rng.gen_range(1..=10usize);
            let mut angles: Vec<f64> = (0..gear_count).map(|_| rng.gen_range(0.0..1.5)).collect();
            angles.shuffle(&mut rng);
            let entries: Vec<(u32, Option<f64>)> = angles.iter().enumerate()
                .map(|(idx, t)| (idx as u32 + 1, if rng.gen_bool(0.85) { Some(*t) } else { None }))
                .collect();
            let m = model(&entries);
            for _ in 0..20 {
                let theta: f64 = rng.gen_range(-0.5..2.0);
                assert_eq!(classify(Some(theta), &m), brute_force(theta, &m));
            }
        }
    }

    #[test]
    fn records_without_calibration() {
        let mut records = build_features(&[
            sample_at(0, Some(600.0), Some(10.0), 1),
            sample_at(1, Some(900.0), Some(12.0), 1),
        ]);
        classify_records(&mut records, None);
        assert!(records.iter().all(|r| r.closest_gear == UNCLASSIFIED_GEAR));
        let m = model(&[(1, Some(0.30)), (2, Some(0.70))]);
        classify_records(&mut records, Some(&m));
        assert!(records.iter().all(|r| r.closest_gear != UNCLASSIFIED_GEAR));
    }
}
