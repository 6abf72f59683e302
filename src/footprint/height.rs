// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Height heuristic for building footprints

use super::FootprintAttributes;
use crate::config::HeightOptions;

/// Resolves an extrusion height from footprint tags.
///
/// Rules are tried in priority order (explicit height, level count, building
/// type) and the first tag that is *present* decides the outcome. A present
/// tag that fails to parse yields the default height; later rules are not
/// consulted.
#[derive(Debug, Clone)]
pub struct HeightEstimator {
    options: HeightOptions,
}

impl HeightEstimator {
    pub fn new(options: HeightOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HeightOptions {
        &self.options
    }

    /// Height in meters, always positive for validated options
    pub fn estimate(&self, attributes: &FootprintAttributes) -> f64 {
        let opts = &self.options;

        if let Some(raw) = &attributes.height {
            return parse_height_tag(raw)
                .map(|h| h.clamp(opts.min_height, opts.max_height))
                .unwrap_or(opts.default_height);
        }

        if let Some(raw) = &attributes.levels {
            return raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|levels| *levels > 0)
                .map(|levels| levels as f64 * opts.meters_per_level)
                .unwrap_or(opts.default_height);
        }

        if let Some(building) = &attributes.building {
            let key = building.trim().to_lowercase();
            if let Some(height) = opts.type_heights.get(&key) {
                return *height;
            }
        }

        opts.default_height
    }
}

impl Default for HeightEstimator {
    fn default() -> Self {
        Self::new(HeightOptions::default())
    }
}

/// Parse `"12.5"`, `"12.5m"`, `"12.5 m"` into meters
fn parse_height_tag(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed
        .strip_suffix('m')
        .or_else(|| trimmed.strip_suffix('M'))
        .unwrap_or(trimmed)
        .trim_end();

    number.parse::<f64>().ok().filter(|h| h.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn estimate(attributes: FootprintAttributes) -> f64 {
        HeightEstimator::default().estimate(&attributes)
    }

    #[test]
    fn test_explicit_height_clamped() {
        let a = FootprintAttributes::default();
        assert_relative_eq!(estimate(a.clone().with_height("350m")), 300.0);
        assert_relative_eq!(estimate(a.clone().with_height("1m")), 3.0);
        assert_relative_eq!(estimate(a.clone().with_height("12.5 m")), 12.5);
        assert_relative_eq!(estimate(a.with_height(" 42 ")), 42.0);
    }

    #[test]
    fn test_levels_unclamped() {
        let a = FootprintAttributes::default();
        assert_relative_eq!(estimate(a.clone().with_levels("4")), 14.0);
        assert_relative_eq!(estimate(a.with_levels("100")), 350.0);
    }

    #[test]
    fn test_building_type_case_insensitive() {
        let a = FootprintAttributes::default();
        assert_relative_eq!(estimate(a.clone().with_building("skyscraper")), 120.0);
        assert_relative_eq!(estimate(a.clone().with_building("House")), 8.0);
        assert_relative_eq!(estimate(a.clone().with_building("RETAIL")), 25.0);
        assert_relative_eq!(estimate(a.with_building("Office")), 45.0);
    }

    #[test]
    fn test_default_when_nothing_matches() {
        assert_relative_eq!(estimate(FootprintAttributes::default()), 15.0);
        assert_relative_eq!(
            estimate(FootprintAttributes::default().with_building("yes")),
            15.0
        );
    }

    #[test]
    fn test_unparsable_height_short_circuits() {
        let a = FootprintAttributes::default()
            .with_height("tall")
            .with_levels("10")
            .with_building("skyscraper");
        assert_relative_eq!(estimate(a), 15.0);
    }

    #[test]
    fn test_unparsable_levels_short_circuits() {
        let a = FootprintAttributes::default()
            .with_levels("4.5")
            .with_building("skyscraper");
        assert_relative_eq!(estimate(a), 15.0);

        let zero = FootprintAttributes::default().with_levels("0");
        assert_relative_eq!(estimate(zero), 15.0);
    }

    #[test]
    fn test_height_wins_over_levels() {
        let a = FootprintAttributes::default()
            .with_height("20")
            .with_levels("10");
        assert_relative_eq!(estimate(a), 20.0);
    }

    #[test]
    fn test_non_finite_height_rejected() {
        let a = FootprintAttributes::default().with_height("NaN");
        assert_relative_eq!(estimate(a), 15.0);
    }

    #[test]
    fn test_custom_options() {
        let mut options = HeightOptions::default();
        options.default_height = 10.0;
        options.type_heights.insert("garage".into(), 3.0);
        let estimator = HeightEstimator::new(options);

        assert_relative_eq!(estimator.estimate(&FootprintAttributes::default()), 10.0);
        assert_relative_eq!(
            estimator.estimate(&FootprintAttributes::default().with_building("garage")),
            3.0
        );
    }
}
