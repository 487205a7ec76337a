use model::stop::Stop;

use crate::cities::is_service_word;
use crate::normalize::is_reference_city;

/// Outcome of validating one stop record. All failures are collected, not
/// just the first one.
#[derive(Debug, Clone)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    fn of(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

const MIN_NAME_LENGTH: usize = 3;

/// Checks a stop record against the dataset rules: a usable name, coordinates
/// in range when present, and a canonical city key that is neither a service
/// word nor unknown to the unified reference.
pub fn validate_stop(stop: &Stop) -> Validation {
    let mut errors = Vec::new();

    if stop.name.trim().chars().count() < MIN_NAME_LENGTH {
        errors.push(format!(
            "name {:?} is missing or shorter than {MIN_NAME_LENGTH} characters",
            stop.name
        ));
    }

    if let Some(location) = &stop.location {
        if !location.latitude.is_finite()
            || !(-90.0..=90.0).contains(&location.latitude)
        {
            errors.push(format!(
                "latitude {} is out of range [-90, 90]",
                location.latitude
            ));
        }
        if !location.longitude.is_finite()
            || !(-180.0..=180.0).contains(&location.longitude)
        {
            errors.push(format!(
                "longitude {} is out of range [-180, 180]",
                location.longitude
            ));
        }
    }

    if stop.city.is_empty() {
        errors.push("city key is missing".to_owned());
    } else if is_service_word(&stop.city) {
        errors.push(format!(
            "city key {:?} is a service word, not a city",
            stop.city
        ));
    } else if !is_reference_city(&stop.city) {
        errors.push(format!(
            "city key {:?} is not in the unified reference",
            stop.city
        ));
    }

    Validation::of(errors)
}

#[cfg(test)]
mod tests {
    use model::{stop::StopKind, Location};
    use utility::id::Id;

    use super::*;

    fn stop(name: &str, location: Option<Location>, city: &str) -> Stop {
        Stop {
            id: Id::new("stop-1".to_owned()),
            name: name.to_owned(),
            location,
            city: city.to_owned(),
            kind: StopKind::Generic,
            is_virtual: false,
        }
    }

    #[test]
    fn accepts_a_well_formed_stop() {
        let validation = validate_stop(&stop(
            "Автовокзал Якутск",
            Some(Location::new(62.03, 129.73)),
            "якутск",
        ));
        assert!(validation.valid, "{:?}", validation.errors);
    }

    #[test]
    fn collects_every_failure() {
        // short name, both coordinates out of range, service-word city
        let validation = validate_stop(&stop(
            "AB",
            Some(Location::new(91.0, -181.0)),
            "туймаада",
        ));
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 4, "{:?}", validation.errors);
    }

    #[test]
    fn missing_coordinates_are_allowed() {
        let validation = validate_stop(&stop("Причал Сангар", None, "сангар"));
        assert!(validation.valid, "{:?}", validation.errors);
    }

    #[test]
    fn unknown_city_is_rejected() {
        let validation =
            validate_stop(&stop("Вокзал Тында", None, "тында"));
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 1);
    }

    #[test]
    fn missing_city_is_a_single_error() {
        let validation = validate_stop(&stop("Остановка Центр", None, ""));
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 1);
    }
}
