use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use fuel_price_engine::StoreError;
use fuel_price_engine::models::{
    CreateStationDto, FuelType, GasPrices, Location, PriceHistory, Station, User,
};
use serde_json::json;
use uuid::Uuid;

fn sample_station() -> Station {
    let time = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    Station {
        id: 7,
        name: "Central".into(),
        address: "Main St 1".into(),
        supported_fuel: vec![FuelType::Gasoline, FuelType::Diesel],
        location: Location::new(52.5, 13.4),
        current_price: GasPrices {
            prices: BTreeMap::from([(FuelType::Gasoline, 1.5), (FuelType::Diesel, 1.4)]),
            time,
        },
        price_history: vec![],
    }
}

#[test]
fn test_station_serialization_shape() {
    let json_val = serde_json::to_value(sample_station()).unwrap();

    assert_eq!(json_val["id"], 7);
    assert_eq!(json_val["supported_fuel"], json!(["gasoline", "diesel"]));
    assert_eq!(json_val["location"], json!({ "latitude": 52.5, "longitude": 13.4 }));
    assert_eq!(json_val["current_price"]["prices"], json!({ "gasoline": 1.5, "diesel": 1.4 }));
    assert!(json_val["current_price"]["time"].is_string());
    assert_eq!(json_val["price_history"], json!([]));
}

#[test]
fn test_station_roundtrip_through_json() {
    let station = sample_station();
    let text = serde_json::to_string(&station).unwrap();
    let back: Station = serde_json::from_str(&text).unwrap();
    assert_eq!(back, station);
}

#[test]
fn test_create_dto_deserialization() {
    let dto: CreateStationDto = serde_json::from_value(json!({
        "name": "North",
        "address": "Ring 5",
        "supported_fuel": ["gasoline", "diesel"],
        "location": { "latitude": 1.0, "longitude": 2.0 },
        "prices": { "gasoline": 1.50, "diesel": 1.40 }
    }))
    .unwrap();

    assert_eq!(dto.supported_fuel, vec!["gasoline", "diesel"]);
    assert_eq!(dto.prices["diesel"], 1.40);
}

#[test]
fn test_fuel_type_parsing() {
    assert_eq!("gasoline".parse::<FuelType>().unwrap(), FuelType::Gasoline);
    assert_eq!("diesel".parse::<FuelType>().unwrap(), FuelType::Diesel);
    assert_eq!("gas".parse::<FuelType>().unwrap(), FuelType::Gas);

    assert_eq!(
        "kerosene".parse::<FuelType>(),
        Err(StoreError::InvalidFuelType("kerosene".into()))
    );
    // 大文字は受け付けない
    assert!("Diesel".parse::<FuelType>().is_err());
}

#[test]
fn test_location_bounds() {
    assert!(Location::new(90.0, 180.0).is_valid());
    assert!(Location::new(-90.0, -180.0).is_valid());
    assert!(!Location::new(90.1, 0.0).is_valid());
    assert!(!Location::new(0.0, -180.5).is_valid());
    assert!(!Location::new(f64::NAN, 0.0).is_valid());
}

#[test]
fn test_user_hash_is_not_serialized() {
    let user = User {
        id: Uuid::new_v4(),
        username: "admin".into(),
        email: "admin@example.com".into(),
        password_hash: "$argon2id$secret".into(),
    };
    let json_val = serde_json::to_value(&user).unwrap();
    assert_eq!(json_val["email"], "admin@example.com");
    assert!(json_val.get("password_hash").is_none());
    assert!(!json_val.to_string().contains("argon2"));
}

#[test]
fn test_price_history_keys_are_timestamps() {
    let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 10).unwrap();
    let history = PriceHistory { history_prices: BTreeMap::from([(t2, 1.6), (t1, 1.5)]) };

    let json_val = serde_json::to_value(&history).unwrap();
    let map = json_val["history_prices"].as_object().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["2026-01-01T00:00:00Z"], 1.5);
    assert_eq!(map["2026-01-01T00:00:10Z"], 1.6);
}
