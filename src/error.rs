use thiserror::Error;

use crate::models::FuelType;

/// ストア（リポジトリ）操作のエラー
///
/// ハンドラー層はこれを `{ "error": message }` に変換して返す。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// ID やメールアドレスに該当するデータがない
    #[error("{0} not found")]
    NotFound(String),

    /// 未知の燃料、または対応燃料に含まれない価格キー
    #[error("invalid fuel type: {0}")]
    InvalidFuelType(String),

    /// 燃料自体は正しいが、このステーションでは扱っていない
    #[error("fuel type {0} is not supported by this station")]
    FuelNotSupported(FuelType),

    #[error("invalid price for {fuel}: {price} (must be non-negative)")]
    NegativePrice { fuel: FuelType, price: f64 },

    #[error("validation error: {0}")]
    Validation(String),

    /// パスワードのハッシュ化に失敗した
    #[error("credential error: {0}")]
    Credential(String),
}

impl StoreError {
    pub fn station_not_found(id: u64) -> Self {
        StoreError::NotFound(format!("station with id {id}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
