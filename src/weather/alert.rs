//! Rain alert classification

use crate::models::{RainAlert, WeatherSample};

/// The first hazard sample in route order, if any
#[must_use]
pub fn classify(samples: &[WeatherSample]) -> Option<RainAlert> {
    samples
        .iter()
        .filter(|sample| sample.is_hazard)
        .min_by_key(|sample| sample.sample_index)
        .map(RainAlert::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, WeatherCondition};

    fn sample(index: usize, probability: u8) -> WeatherSample {
        WeatherSample {
            sample_index: index,
            coord: Coordinate::new(-8.0 - index as f64 * 0.1, -35.0),
            temperature_c: 25.0,
            precipitation_probability_pct: probability,
            condition: WeatherCondition::default(),
            is_hazard: probability >= 40,
            location_name: (probability >= 40).then(|| format!("Town {index}")),
        }
    }

    #[test]
    fn test_first_hazard_wins() {
        let samples = vec![sample(0, 5), sample(1, 45), sample(2, 60)];
        let alert = classify(&samples).unwrap();
        assert_eq!(alert.probability_pct, 45);
        assert_eq!(alert.location_name.as_deref(), Some("Town 1"));
        assert_eq!(alert.coord, samples[1].coord);
    }

    #[test]
    fn test_route_order_not_slice_order() {
        let samples = vec![sample(3, 90), sample(0, 10), sample(2, 41)];
        assert_eq!(classify(&samples).unwrap().probability_pct, 41);
    }

    #[test]
    fn test_no_hazard() {
        assert!(classify(&[sample(0, 0), sample(1, 39)]).is_none());
        assert!(classify(&[]).is_none());
    }
}
