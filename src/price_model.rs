//! 価格モデル: 離散化した幾何ブラウン運動 (GBM)
//!
//! 1ステップごとに `price *= exp((μ - σ²/2)·dt + σ·√dt·z)` を掛ける。
//! 掛けるのは常に正の値なので、正の価格は正のまま、0 は 0 のまま。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// ドリフト μ
pub const DRIFT: f64 = 0.05;
/// ボラティリティ σ
pub const VOLATILITY: f64 = 0.2;
/// シミュレーション期間 T
pub const HORIZON: f64 = 1.0;
/// 刻み幅 dt（T / dt = 100 ステップ）
pub const STEP: f64 = 0.01;

/// 1種類の燃料について次の価格を計算する
///
/// 乱数生成器は呼び出し側が持つ（呼び出しのたびに作り直さない）。
///
/// # 例
///
/// ```
/// use fuel_price_engine::price_model::{next_price, seeded_rng};
///
/// let mut rng = seeded_rng(Some(7));
/// let price = next_price(1.50, &mut rng);
/// assert!(price > 0.0);
/// assert_eq!(next_price(0.0, &mut rng), 0.0);
/// ```
pub fn next_price<R: Rng + ?Sized>(old: f64, rng: &mut R) -> f64 {
    let steps = (HORIZON / STEP).round() as usize;
    let drift = (DRIFT - 0.5 * VOLATILITY * VOLATILITY) * STEP;
    let diffusion = VOLATILITY * STEP.sqrt();

    (0..steps).fold(old, |price, _| {
        let z: f64 = rng.sample(StandardNormal);
        price * (drift + diffusion * z).exp()
    })
}

/// ジェネレータ用の乱数生成器を1回だけ初期化する
///
/// シードがあれば再現可能な系列、なければOSのエントロピーから。
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_prices_stay_positive() {
        let mut rng = seeded_rng(Some(42));
        for start in [0.0001, 0.5, 1.5, 100.0, 1.0e6] {
            let mut price = start;
            for _ in 0..200 {
                price = next_price(price, &mut rng);
                assert!(price > 0.0, "price fell to {price} from start {start}");
                assert!(price.is_finite());
            }
        }
    }

    #[test]
    fn zero_is_absorbing() {
        let mut rng = seeded_rng(Some(1));
        for _ in 0..10 {
            assert_eq!(next_price(0.0, &mut rng), 0.0);
        }
    }

    #[test]
    fn same_seed_gives_same_path() {
        let mut a = seeded_rng(Some(99));
        let mut b = seeded_rng(Some(99));
        for _ in 0..5 {
            assert_eq!(next_price(1.4, &mut a), next_price(1.4, &mut b));
        }
    }

    #[test]
    fn consecutive_draws_differ() {
        // 同じ時刻に続けて呼んでも乱数系列は進む
        let mut rng = seeded_rng(None);
        let first = next_price(1.5, &mut rng);
        let second = next_price(1.5, &mut rng);
        assert!((first - second).abs() > f64::EPSILON);
    }
}
