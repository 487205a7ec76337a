use model::{route::Route, stop::Stop};
use utility::id::Id;

use crate::cities::{self, AIRPORTS, SUBURBS};

/// Canonicalizes an arbitrary city label.
///
/// Applies, in order: lowercasing, folding of "ё" to "е", trimming, collapse
/// of internal whitespace, stripping of the "г."/"город" prefixes, then
/// airport and suburb replacement followed by one more cleanup pass. The
/// function is idempotent: feeding its output back in returns it unchanged.
pub fn normalize_city(input: &str) -> String {
    let key = clean(input);
    if let Some(city) = AIRPORTS.get(key.as_str()) {
        return clean(city);
    }
    if let Some(city) = SUBURBS.get(key.as_str()) {
        return clean(city);
    }
    key
}

fn clean(input: &str) -> String {
    let lowered = input.to_lowercase().replace('ё', "е");
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_city_prefix(&collapsed).to_owned()
}

fn strip_city_prefix(value: &str) -> &str {
    if let Some(rest) = value.strip_prefix("г.") {
        return rest.trim_start();
    }
    if let Some(rest) = value.strip_prefix("город ") {
        return rest;
    }
    value
}

/// Whether a normalized key is accepted, i.e. present in the unified cities
/// reference.
pub fn is_reference_city(key: &str) -> bool {
    cities::reference_city(key).is_some()
}

/// Stable identifier of the virtual stop representing a city. A pure function
/// of the normalized key: case variants and ё/е variants of the same city map
/// to the same id, across runs and datasets.
pub fn virtual_stop_id(city: &str) -> Id<Stop> {
    Id::new(format!("virtual-stop-{}", normalize_city(city)))
}

/// Stable identifier of the virtual route between two stops, direction
/// sensitive.
pub fn virtual_route_id(from: &Id<Stop>, to: &Id<Stop>) -> Id<Route> {
    Id::new(format!("virtual-route-{from}-{to}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_idempotent() {
        for input in [
            "Якутск",
            "г. Якутск",
            "город Верхоянск",
            "  ОЛЁКМИНСК  ",
            "Серебряный   Бор",
            "Маган",
            "unknown place",
        ] {
            let once = normalize_city(input);
            assert_eq!(normalize_city(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn folds_and_strips() {
        assert_eq!(normalize_city("Якутск"), "якутск");
        assert_eq!(normalize_city("г.Якутск"), "якутск");
        assert_eq!(normalize_city("г. Якутск"), "якутск");
        assert_eq!(normalize_city("город Якутск"), "якутск");
        assert_eq!(normalize_city("ОЛЁКМИНСК"), "олекминск");
        assert_eq!(normalize_city("  Усть-Нера "), "усть-нера");
    }

    #[test]
    fn airports_and_suburbs_resolve_to_their_city() {
        assert_eq!(normalize_city("Маган"), "якутск");
        assert_eq!(normalize_city("Чульман"), "нерюнгри");
        assert_eq!(normalize_city("Жатай"), "якутск");
        assert_eq!(normalize_city("Серебряный  Бор"), "нерюнгри");
        assert_eq!(normalize_city("Мохсоголлох"), "покровск");
    }

    #[test]
    fn acceptance_follows_the_unified_reference() {
        assert!(is_reference_city(&normalize_city("г. Мирный")));
        assert!(!is_reference_city(&normalize_city("Москва")));
        assert!(!is_reference_city(""));
    }

    #[test]
    fn virtual_stop_ids_are_stable_across_variants() {
        let id = virtual_stop_id("Верхоянск");
        assert_eq!(id.raw(), "virtual-stop-верхоянск");
        assert_eq!(virtual_stop_id("ВЕРХОЯНСК"), id);
        assert_eq!(virtual_stop_id("г. Верхоянск"), id);

        let eyo = virtual_stop_id("Олёкминск");
        let e = virtual_stop_id("Олекминск");
        assert_eq!(eyo, e);
    }

    #[test]
    fn virtual_route_ids_are_direction_sensitive() {
        let a = virtual_stop_id("Якутск");
        let b = virtual_stop_id("Тикси");
        let forward = virtual_route_id(&a, &b);
        let backward = virtual_route_id(&b, &a);
        assert_eq!(
            forward.raw(),
            "virtual-route-virtual-stop-якутск-virtual-stop-тикси"
        );
        assert_ne!(forward, backward);
    }
}
