use std::time::Duration;

use clap::Parser;

use crate::models::UserDto;
use crate::pipeline::PipelineSettings;

/// 燃料価格サーバーの設定
///
/// コマンドライン引数、なければ環境変数（.env も可）から読む。
#[derive(Parser, Debug, Clone)]
#[command(name = "fuel-price-server")]
#[command(version, about)]
pub struct Config {
    /// HTTP の待ち受けアドレス
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// 価格を生成する間隔（秒）
    #[arg(long, env = "PRICE_INTERVAL_SECS", default_value_t = 10)]
    pub price_interval_secs: u64,

    /// 乱数のシード（指定すると価格の系列が再現可能になる）
    #[arg(long, env = "PRICE_SEED")]
    pub price_seed: Option<u64>,

    /// トークン署名用の秘密鍵
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// トークンの有効期間（秒）
    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = 3600)]
    pub token_ttl_secs: u64,

    #[arg(long, env = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.price_interval_secs == 0 {
            return Err("PRICE_INTERVAL_SECS must be greater than 0".to_string());
        }
        if self.jwt_secret.trim().is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if self.token_ttl_secs == 0 {
            return Err("TOKEN_TTL_SECS must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            interval: Duration::from_secs(self.price_interval_secs),
            seed: self.price_seed,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// 3つとも揃っているときだけ初期管理者を作る
    pub fn admin(&self) -> Option<UserDto> {
        match (&self.admin_username, &self.admin_email, &self.admin_password) {
            (Some(username), Some(email), Some(password)) => Some(UserDto {
                username: username.clone(),
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}
