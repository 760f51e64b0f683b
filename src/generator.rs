use std::sync::Weak;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::models::{GasPrices, StationId};
use crate::pipeline::{PriceBook, stopped};
use crate::price_model::next_price;
use crate::updater::PriceMessage;

/// 価格ジェネレータ（プロデューサー側のループ）
///
/// interval ごとに:
/// 1. ステーションの現在価格を読む（ロックは読み取りの間だけ）
/// 2. 燃料ごとに価格モデルを適用し、生成時刻を付ける
/// 3. アップデータに渡し、適用完了の返信を待つ
///
/// 最初の生成は作成から interval 後。停止シグナルはどの待機点よりも優先する。
pub async fn run_price_generator<B: PriceBook>(
    book: Weak<B>,
    station_id: StationId,
    interval: Duration,
    mut rng: StdRng,
    tx: mpsc::Sender<PriceMessage>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    // 遅れた分をまとめて撃たない
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            _ = ticker.tick() => {}
        }

        let current = match book.upgrade() {
            Some(book) => book.current_price(station_id),
            None => None,
        };
        let Some(current) = current else {
            debug!(station_id, "station no longer present");
            break;
        };

        let next = GasPrices::new(
            current
                .prices
                .iter()
                .map(|(fuel, price)| (*fuel, next_price(*price, &mut rng)))
                .collect(),
        );
        trace!(station_id, prices = ?next.prices, "generated prices");

        let (applied_tx, applied_rx) = oneshot::channel();
        let message = PriceMessage { prices: next, applied: applied_tx };

        tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            sent = tx.send(message) => {
                if sent.is_err() {
                    debug!(station_id, "price updater gone");
                    break;
                }
            }
        }

        tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            applied = applied_rx => {
                if applied.is_err() {
                    debug!(station_id, "price update was not applied");
                    break;
                }
            }
        }
    }

    info!(station_id, "price generator stopped");
}
