use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// ステーションの識別子（ストア内で単調増加する連番）
pub type StationId = u64;

/// 燃料の種類
///
/// JSONでは小文字の文字列（"gasoline", "diesel", "gas"）として扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Gasoline,
    Diesel,
    Gas,
}

impl FuelType {
    pub const ALL: [FuelType; 3] = [FuelType::Gasoline, FuelType::Diesel, FuelType::Gas];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Gasoline => "gasoline",
            FuelType::Diesel => "diesel",
            FuelType::Gas => "gas",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = StoreError;

    /// 未知のリテラルは `InvalidFuelType` になる（大文字小文字は区別する）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelType::ALL
            .into_iter()
            .find(|fuel| fuel.as_str() == s)
            .ok_or_else(|| StoreError::InvalidFuelType(s.to_string()))
    }
}

/// 緯度・経度のペア（度単位）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// 緯度が [-90, 90]、経度が [-180, 180] に収まっているか（NaNは不正）
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// ある時点の価格スナップショット
///
/// # フィールド
/// - prices: 燃料の種類 → 価格（キーは必ずステーションの対応燃料に含まれる）
/// - time: スナップショットが作られた時刻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasPrices {
    pub prices: BTreeMap<FuelType, f64>,
    pub time: DateTime<Utc>,
}

impl GasPrices {
    /// 現在時刻のタイムスタンプ付きでスナップショットを作る
    pub fn new(prices: BTreeMap<FuelType, f64>) -> Self {
        Self { prices, time: Utc::now() }
    }
}

/// 1つのガソリンスタンド
///
/// current_price と price_history は価格パイプラインによって更新される。
/// price_history は追記のみ（古い current_price がそのまま積まれる）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub address: String,
    pub supported_fuel: Vec<FuelType>,
    pub location: Location,
    pub current_price: GasPrices,
    pub price_history: Vec<GasPrices>,
}

impl Station {
    pub fn supports(&self, fuel: FuelType) -> bool {
        self.supported_fuel.contains(&fuel)
    }
}

/// POST /station のリクエストボディ
///
/// 燃料は文字列のまま受け取り、ストア側で検証する（未知の燃料は `InvalidFuelType`）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStationDto {
    pub name: String,
    pub address: String,
    pub supported_fuel: Vec<String>,
    pub location: Location,
    pub prices: HashMap<String, f64>,
}

/// PUT /station のリクエストボディ（価格と履歴は変更しない）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStationDto {
    pub id: StationId,
    pub name: String,
    pub address: String,
    pub supported_fuel: Vec<String>,
    pub location: Location,
}

/// 1種類の燃料の価格履歴（タイムスタンプ → 価格、時刻順）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub history_prices: BTreeMap<DateTime<Utc>, f64>,
}

/// 最寄りステーション検索の1件分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStation {
    pub id: StationId,
    pub name: String,
    pub address: String,
    pub location: Location,
    pub current_price: BTreeMap<FuelType, f64>,
    pub distance_km: f64,
}

/// ユーザー
///
/// password_hash はJSONに出さない（argon2のPHC文字列）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// POST /user のリクエストボディ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// PUT /user のリクエストボディ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDto {
    pub token: String,
}
