use phf::{phf_map, phf_set};
use schemars::JsonSchema;
use serde::Serialize;

/// City of the unified reference. Every reference city is guaranteed to end
/// up as at least one graph node, virtual if need be.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCity {
    /// Canonical key: lowercase, "ё" folded to "е".
    pub key: &'static str,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// The designated transfer hub for virtual routes.
pub const HUB_CITY: &str = "якутск";

const CITIES: &[ReferenceCity] = &[
    ReferenceCity { key: "якутск", name: "Якутск", latitude: 62.0355, longitude: 129.6755 },
    ReferenceCity { key: "мирный", name: "Мирный", latitude: 62.5353, longitude: 113.9611 },
    ReferenceCity { key: "нерюнгри", name: "Нерюнгри", latitude: 56.6593, longitude: 124.7204 },
    ReferenceCity { key: "алдан", name: "Алдан", latitude: 58.6097, longitude: 125.3894 },
    ReferenceCity { key: "ленск", name: "Ленск", latitude: 60.7276, longitude: 114.9279 },
    ReferenceCity { key: "олекминск", name: "Олёкминск", latitude: 60.3758, longitude: 120.4062 },
    ReferenceCity { key: "вилюйск", name: "Вилюйск", latitude: 63.7462, longitude: 121.6287 },
    ReferenceCity { key: "верхоянск", name: "Верхоянск", latitude: 67.5447, longitude: 133.3850 },
    ReferenceCity { key: "среднеколымск", name: "Среднеколымск", latitude: 67.4581, longitude: 153.7069 },
    ReferenceCity { key: "покровск", name: "Покровск", latitude: 61.4844, longitude: 129.1480 },
    ReferenceCity { key: "удачный", name: "Удачный", latitude: 66.4070, longitude: 112.3067 },
    ReferenceCity { key: "томмот", name: "Томмот", latitude: 58.9564, longitude: 126.2925 },
    ReferenceCity { key: "хандыга", name: "Хандыга", latitude: 62.6560, longitude: 135.5540 },
    ReferenceCity { key: "чурапча", name: "Чурапча", latitude: 62.0025, longitude: 132.4325 },
    ReferenceCity { key: "майя", name: "Майя", latitude: 61.7333, longitude: 130.2833 },
    ReferenceCity { key: "бердигестях", name: "Бердигестях", latitude: 62.0989, longitude: 126.6992 },
    ReferenceCity { key: "амга", name: "Амга", latitude: 60.8989, longitude: 131.9773 },
    ReferenceCity { key: "сангар", name: "Сангар", latitude: 63.9242, longitude: 127.4739 },
    ReferenceCity { key: "жиганск", name: "Жиганск", latitude: 66.7697, longitude: 123.3711 },
    ReferenceCity { key: "тикси", name: "Тикси", latitude: 71.6366, longitude: 128.8685 },
    ReferenceCity { key: "черский", name: "Черский", latitude: 68.7500, longitude: 161.3300 },
    ReferenceCity { key: "батагай", name: "Батагай", latitude: 67.6558, longitude: 134.6350 },
    ReferenceCity { key: "усть-нера", name: "Усть-Нера", latitude: 64.5667, longitude: 143.2000 },
    ReferenceCity { key: "депутатский", name: "Депутатский", latitude: 69.3000, longitude: 139.9000 },
    ReferenceCity { key: "зырянка", name: "Зырянка", latitude: 65.7360, longitude: 150.8900 },
    ReferenceCity { key: "саскылах", name: "Саскылах", latitude: 71.9650, longitude: 114.0917 },
    ReferenceCity { key: "оленек", name: "Оленёк", latitude: 68.5000, longitude: 112.4333 },
    ReferenceCity { key: "нюрба", name: "Нюрба", latitude: 63.2842, longitude: 118.3319 },
    ReferenceCity { key: "сунтар", name: "Сунтар", latitude: 62.1444, longitude: 117.6319 },
];

/// Airport settlement names that stand in for their city in upstream records.
pub static AIRPORTS: phf::Map<&'static str, &'static str> = phf_map! {
    "маган" => "якутск",
    "полярный" => "удачный",
    "чульман" => "нерюнгри",
};

/// Suburb and satellite settlements mapped to their main city.
pub static SUBURBS: phf::Map<&'static str, &'static str> = phf_map! {
    "жатай" => "якутск",
    "кангалассы" => "якутск",
    "мохсоголлох" => "покровск",
    "серебряный бор" => "нерюнгри",
};

/// Generic transit nouns that must never stand in for a city name.
pub static SERVICE_WORDS: phf::Set<&'static str> = phf_set! {
    "центральная",
    "главный",
    "пассажирский",
    "международный",
    "внутренний",
    "туймаада",
    "туймада",
    "аэропорт",
    "вокзал",
    "автостанция",
    "станция",
    "остановка",
};

pub fn reference_cities() -> &'static [ReferenceCity] {
    CITIES
}

pub fn reference_city(key: &str) -> Option<&'static ReferenceCity> {
    CITIES.iter().find(|city| city.key == key)
}

pub fn is_service_word(key: &str) -> bool {
    SERVICE_WORDS.contains(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_is_a_reference_city() {
        assert!(reference_city(HUB_CITY).is_some());
    }

    #[test]
    fn keys_are_canonical() {
        for city in reference_cities() {
            assert_eq!(city.key, city.key.to_lowercase());
            assert!(!city.key.contains('ё'), "{} contains ё", city.key);
            assert!(!is_service_word(city.key));
        }
    }

    #[test]
    fn airport_and_suburb_targets_are_reference_cities() {
        for target in AIRPORTS.values().chain(SUBURBS.values()) {
            assert!(reference_city(target).is_some(), "missing {target}");
        }
    }
}
