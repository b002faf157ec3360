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

/// Format an optional value with a fixed number of decimal places, or a blank
/// placeholder when there is no value to show
pub fn format_optional(val: Option<f64>, decimal_places: usize) -> String {
    match val {
        Some(v) if v.is_finite() => format!("{:.*}", decimal_places, v),
        _ => String::from("-")
    }
}

/// Returns the value only if it is a usable number (not NaN or infinite)
pub fn finite(val: f64) -> Option<f64> {
    if val.is_finite() {
        return Some(val);
    }
    None
}
