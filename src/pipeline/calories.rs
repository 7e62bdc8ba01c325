//! Multi-factor calorie estimate for a ride.
//!
//! The estimate is the sum of four terms: a MET-based base cost, the work
//! done against gravity, a wind adjustment and an environmental adjustment
//! for heat, cold and humidity. Missing weather leaves the last two at zero.

use crate::types::activity::RideMetrics;
use crate::types::analysis::{CalorieBreakdownEntry, CalorieEstimate};
use crate::types::weather::WeatherSnapshot;

pub mod constants {
    /// Cycling MET values by average speed, from the Compendium of Physical
    /// Activities (Ainsworth et al., 2011). Each entry is the upper bound of
    /// the bracket in km/h and the MET for speeds below it.
    pub const MET_BRACKETS: [(f64, f64); 5] = [
        (16.0, 4.0),
        (19.0, 6.8),
        (22.0, 8.0),
        (25.0, 10.0),
        (30.0, 12.0),
    ];

    /// MET at or above the last bracket (racing pace).
    pub const MET_RACING: f64 = 15.8;

    /// Standard gravity (m/s^2).
    pub const GRAVITY: f64 = 9.80665;

    /// Joules in one kilocalorie.
    pub const JOULES_PER_KCAL: f64 = 4184.0;

    /// Gross mechanical efficiency of cycling muscles.
    pub const GROSS_EFFICIENCY: f64 = 0.25;

    /// Neutral temperature (C) at which no thermal adjustment applies.
    pub const NEUTRAL_TEMPERATURE_C: f64 = 20.0;

    /// Neutral relative humidity (%).
    pub const NEUTRAL_HUMIDITY_PERCENT: f64 = 50.0;

    /// Fraction of base cost added per degree away from neutral.
    pub const TEMPERATURE_FACTOR_PER_DEGREE: f64 = 0.01;

    /// Fraction of base cost added per humidity percentage point away from neutral.
    pub const HUMIDITY_FACTOR_PER_PERCENT: f64 = 0.002;
}

pub const FACTOR_BASE: &str = "base";
pub const FACTOR_ELEVATION: &str = "elevation";
pub const FACTOR_WIND: &str = "wind";
pub const FACTOR_ENVIRONMENTAL: &str = "environmental";

#[derive(Debug, Clone, PartialEq)]
pub struct CalorieConfig {
    /// kcal per (km/h of headwind x kg x hour).
    pub wind_resistance_coefficient: f64,
    /// Largest tailwind reduction, as a fraction of the base term.
    pub max_tailwind_fraction: f64,
    /// Largest environmental increase, as a fraction of the base term.
    pub max_environmental_fraction: f64,
    pub gross_efficiency: f64,
}

impl Default for CalorieConfig {
    fn default() -> Self {
        Self {
            wind_resistance_coefficient: 0.1,
            max_tailwind_fraction: 0.15,
            max_environmental_fraction: 0.25,
            gross_efficiency: constants::GROSS_EFFICIENCY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CalorieModel {
    config: CalorieConfig,
}

impl CalorieModel {
    pub fn new(config: CalorieConfig) -> Self {
        Self { config }
    }

    pub fn estimate(
        &self,
        metrics: &RideMetrics,
        rider_weight_kg: f64,
        weather: &WeatherSnapshot,
    ) -> CalorieEstimate {
        let base = base_calories(metrics, rider_weight_kg);
        let elevation = self.elevation_calories(metrics, rider_weight_kg);
        let wind = self.wind_calories(metrics, rider_weight_kg, weather, base);
        let environmental = self.environmental_calories(weather, base);

        tracing::debug!(
            base,
            elevation,
            wind,
            environmental,
            "Calorie terms computed"
        );

        build_estimate(&[
            (FACTOR_BASE, base),
            (FACTOR_ELEVATION, elevation),
            (FACTOR_WIND, wind),
            (FACTOR_ENVIRONMENTAL, environmental),
        ])
    }

    fn elevation_calories(&self, metrics: &RideMetrics, rider_weight_kg: f64) -> f64 {
        let gain = metrics.elevation_gain_m.unwrap_or(0.0);
        let work_joules = rider_weight_kg * constants::GRAVITY * gain;
        work_joules / constants::JOULES_PER_KCAL / self.config.gross_efficiency
    }

    fn wind_calories(
        &self,
        metrics: &RideMetrics,
        rider_weight_kg: f64,
        weather: &WeatherSnapshot,
        base: f64,
    ) -> f64 {
        let (Some((speed_kmh, from_deg)), Some(heading)) = (weather.wind(), metrics.heading_degrees)
        else {
            return 0.0;
        };

        // wind blowing from the direction of travel is a headwind
        let headwind_kmh = speed_kmh * (from_deg - heading).to_radians().cos();
        let scaled = self.config.wind_resistance_coefficient
            * headwind_kmh.abs()
            * rider_weight_kg
            * metrics.duration_hours();

        if headwind_kmh >= 0.0 {
            scaled
        } else {
            -(scaled / 2.0).min(base * self.config.max_tailwind_fraction)
        }
    }

    fn environmental_calories(&self, weather: &WeatherSnapshot, base: f64) -> f64 {
        let Some(temperature) = weather.temperature() else {
            return 0.0;
        };

        let temperature_dev = (temperature - constants::NEUTRAL_TEMPERATURE_C).abs();
        let humidity_dev = weather
            .humidity()
            .map(|h| (h - constants::NEUTRAL_HUMIDITY_PERCENT).abs())
            .unwrap_or(0.0);

        let fraction = constants::TEMPERATURE_FACTOR_PER_DEGREE * temperature_dev
            + constants::HUMIDITY_FACTOR_PER_PERCENT * humidity_dev;
        base * fraction.min(self.config.max_environmental_fraction)
    }
}

pub fn met_for_speed(avg_speed_kmh: f64) -> f64 {
    constants::MET_BRACKETS
        .iter()
        .find(|(upper, _)| avg_speed_kmh < *upper)
        .map(|(_, met)| *met)
        .unwrap_or(constants::MET_RACING)
}

fn base_calories(metrics: &RideMetrics, rider_weight_kg: f64) -> f64 {
    met_for_speed(metrics.avg_speed_kmh) * rider_weight_kg * metrics.duration_hours()
}

/// Rounds each term so the integers add up to the rounded total, then
/// derives percentages from those integers.
fn build_estimate(terms: &[(&str, f64)]) -> CalorieEstimate {
    let raw_total: f64 = terms.iter().map(|(_, kcal)| kcal).sum();
    let total = raw_total.round() as i64;

    let mut rounded: Vec<i64> = terms.iter().map(|(_, kcal)| kcal.floor() as i64).collect();
    let mut remainder = total - rounded.iter().sum::<i64>();

    // hand out the leftover units to the largest fractional parts first
    let mut order: Vec<usize> = (0..terms.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = terms[a].1 - terms[a].1.floor();
        let fb = terms[b].1 - terms[b].1.floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    let mut cursor = 0;
    while remainder != 0 && !order.is_empty() {
        let slot = order[cursor % order.len()];
        if remainder > 0 {
            rounded[slot] += 1;
            remainder -= 1;
        } else {
            rounded[slot] -= 1;
            remainder += 1;
        }
        cursor += 1;
    }

    let breakdown = terms
        .iter()
        .zip(rounded)
        .map(|((factor, _), calories)| CalorieBreakdownEntry {
            factor: (*factor).to_string(),
            calories,
            percentage_of_total: if total == 0 {
                0.0
            } else {
                (calories as f64 / total as f64 * 1000.0).round() / 10.0
            },
        })
        .collect();

    CalorieEstimate {
        total_kcal: total,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::activity::BoundingBox;

    fn metrics(avg_speed_kmh: f64, hours: f64, gain: Option<f64>, heading: Option<f64>) -> RideMetrics {
        RideMetrics {
            distance_m: avg_speed_kmh * hours * 1000.0,
            duration_seconds: (hours * 3600.0) as u64,
            elevation_gain_m: gain,
            elevation_loss_m: gain,
            avg_speed_kmh,
            max_speed_kmh: None,
            heading_degrees: heading,
            start_time: None,
            end_time: None,
            point_count: 2,
            bounding_box: BoundingBox {
                min_lat: 0.0,
                max_lat: 0.0,
                min_lon: 0.0,
                max_lon: 0.0,
            },
        }
    }

    fn weather(temp: f64, humidity: f64, wind_kmh: f64, wind_from: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_c: Some(temp),
            humidity_percent: Some(humidity),
            wind_speed_kmh: Some(wind_kmh),
            wind_direction_deg: Some(wind_from),
            ..WeatherSnapshot::from_provider("test")
        }
    }

    fn entry<'a>(estimate: &'a CalorieEstimate, factor: &str) -> &'a CalorieBreakdownEntry {
        estimate
            .breakdown
            .iter()
            .find(|e| e.factor == factor)
            .expect("factor present")
    }

    fn assert_consistent(estimate: &CalorieEstimate) {
        let sum: i64 = estimate.breakdown.iter().map(|e| e.calories).sum();
        assert_eq!(sum, estimate.total_kcal);
        if estimate.total_kcal != 0 {
            let pct: f64 = estimate.breakdown.iter().map(|e| e.percentage_of_total).sum();
            assert!((pct - 100.0).abs() <= 1.0, "percentages sum to {pct}");
        }
    }

    #[test]
    fn met_brackets() {
        assert_eq!(met_for_speed(10.0), 4.0);
        assert_eq!(met_for_speed(16.0), 6.8);
        assert_eq!(met_for_speed(21.9), 8.0);
        assert_eq!(met_for_speed(24.0), 10.0);
        assert_eq!(met_for_speed(29.0), 12.0);
        assert_eq!(met_for_speed(30.0), 15.8);
    }

    #[test]
    fn flat_ride_without_weather_is_base_only() {
        let estimate = CalorieModel::default().estimate(
            &metrics(20.0, 1.0, None, Some(0.0)),
            75.0,
            &WeatherSnapshot::no_data(),
        );

        assert_eq!(estimate.total_kcal, 600);
        assert_eq!(entry(&estimate, FACTOR_BASE).calories, 600);
        assert_eq!(entry(&estimate, FACTOR_BASE).percentage_of_total, 100.0);
        assert_eq!(entry(&estimate, FACTOR_WIND).calories, 0);
        assert_eq!(entry(&estimate, FACTOR_ENVIRONMENTAL).calories, 0);
        assert_consistent(&estimate);
    }

    #[test]
    fn climbing_adds_work_against_gravity() {
        let estimate = CalorieModel::default().estimate(
            &metrics(20.0, 1.0, Some(1000.0), None),
            70.0,
            &WeatherSnapshot::no_data(),
        );
        // 70 * 9.80665 * 1000 / 4184 / 0.25 = 656.3
        assert_eq!(entry(&estimate, FACTOR_ELEVATION).calories, 656);
        assert_consistent(&estimate);
    }

    #[test]
    fn headwind_costs_more_and_tailwind_less() {
        let model = CalorieModel::default();
        let ride = metrics(20.0, 1.0, None, Some(90.0));

        let head = model.estimate(&ride, 75.0, &weather(20.0, 50.0, 20.0, 90.0));
        assert_eq!(entry(&head, FACTOR_WIND).calories, 150);

        let tail = model.estimate(&ride, 75.0, &weather(20.0, 50.0, 20.0, 270.0));
        assert_eq!(entry(&tail, FACTOR_WIND).calories, -75);

        let cross = model.estimate(&ride, 75.0, &weather(20.0, 50.0, 20.0, 0.0));
        assert_eq!(entry(&cross, FACTOR_WIND).calories, 0);

        assert_consistent(&head);
        assert_consistent(&tail);
    }

    #[test]
    fn tailwind_reduction_is_bounded() {
        let estimate = CalorieModel::default().estimate(
            &metrics(20.0, 1.0, None, Some(0.0)),
            75.0,
            &weather(20.0, 50.0, 200.0, 180.0),
        );
        // 15% of 600
        assert_eq!(entry(&estimate, FACTOR_WIND).calories, -90);
        assert_consistent(&estimate);
    }

    #[test]
    fn environmental_term_grows_with_deviation_and_is_capped() {
        let model = CalorieModel::default();
        let ride = metrics(20.0, 1.0, None, None);

        let neutral = model.estimate(&ride, 75.0, &weather(20.0, 50.0, 0.0, 0.0));
        assert_eq!(entry(&neutral, FACTOR_ENVIRONMENTAL).calories, 0);

        let hot = model.estimate(&ride, 75.0, &weather(30.0, 80.0, 0.0, 0.0));
        // (0.10 + 0.06) * 600
        assert_eq!(entry(&hot, FACTOR_ENVIRONMENTAL).calories, 96);

        let extreme = model.estimate(&ride, 75.0, &weather(-30.0, 100.0, 0.0, 0.0));
        assert_eq!(entry(&extreme, FACTOR_ENVIRONMENTAL).calories, 150);
    }

    #[test]
    fn zero_duration_ride_has_zero_total() {
        let estimate = CalorieModel::default().estimate(
            &metrics(0.0, 0.0, None, None),
            75.0,
            &weather(35.0, 90.0, 30.0, 0.0),
        );
        assert_eq!(estimate.total_kcal, 0);
        assert!(estimate.breakdown.iter().all(|e| e.percentage_of_total == 0.0));
    }

    #[test]
    fn rounding_keeps_entries_summing_to_total() {
        let estimate = build_estimate(&[("a", 10.4), ("b", 10.4), ("c", 10.4), ("d", -0.6)]);
        // raw 30.6 rounds to 31
        assert_eq!(estimate.total_kcal, 31);
        assert_consistent(&estimate);

        let estimate = build_estimate(&[("a", 1.5), ("b", 1.5), ("c", 1.5), ("d", 0.0)]);
        assert_eq!(estimate.total_kcal, 5);
        assert_consistent(&estimate);
    }
}
