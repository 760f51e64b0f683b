use std::sync::Weak;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::models::{GasPrices, StationId};
use crate::pipeline::{PriceBook, stopped};

/// ジェネレータからアップデータへ渡すメッセージ
///
/// applied は「適用し終わった」ことをジェネレータに返すための返信先。
/// ジェネレータはこれを受け取るまで次の生成に進まない（バックプレッシャー）。
#[derive(Debug)]
pub struct PriceMessage {
    pub prices: GasPrices,
    pub applied: oneshot::Sender<()>,
}

/// 価格アップデータ（コンシューマー側のループ）
///
/// 受け取ったスナップショットをストアのロックの中で適用する:
/// 1. 現在の価格を履歴に積む
/// 2. 現在の価格を新しいものに置き換える
///
/// 停止シグナル、チャネルのクローズ、ステーションの削除のどれかで終了する。
pub async fn run_price_updater<B: PriceBook>(
    book: Weak<B>,
    station_id: StationId,
    mut rx: mpsc::Receiver<PriceMessage>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            message = rx.recv() => match message {
                Some(message) => message,
                None => {
                    debug!(station_id, "price channel closed");
                    break;
                }
            },
        };

        let Some(book) = book.upgrade() else {
            debug!(station_id, "station table dropped");
            break;
        };

        if !book.apply_price(station_id, message.prices) {
            debug!(station_id, "station removed, dropping price update");
            break;
        }
        drop(book);

        // ジェネレータが停止済みなら受信側はもういない
        let _ = message.applied.send(());
    }

    info!(station_id, "price updater stopped");
}
