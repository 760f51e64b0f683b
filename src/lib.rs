//! 燃料価格エンジン
//!
//! ガソリンスタンドと、その燃料価格を常に動かし続けるシミュレーションを提供する。
//!
//! - models: データ型 (Station, GasPrices, FuelType, Location, User)
//! - error: ストアのエラー
//! - price_model: 価格モデル（幾何ブラウン運動）
//! - generator / updater / pipeline: ステーションごとの価格パイプライン
//! - ranking: 最寄りステーションの選択
//! - store / users: インメモリのリポジトリ
//! - auth: トークンとパスワード
//! - api: HTTP API
//! - config: 設定

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod price_model;
pub mod ranking;
pub mod store;
pub mod updater;
pub mod users;

pub use error::{StoreError, StoreResult};
pub use store::StationRepository;
