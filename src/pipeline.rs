//! ステーションごとの価格パイプライン（ジェネレータ → チャネル → アップデータ）

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::generator::run_price_generator;
use crate::models::{GasPrices, StationId};
use crate::price_model::seeded_rng;
use crate::updater::run_price_updater;

/// パイプラインから見たステーションの価格台帳
///
/// 実装はストア側のロックの中で読み書きすること。
/// どちらもステーションが存在しなければ None / false を返す。
pub trait PriceBook: Send + Sync + 'static {
    fn current_price(&self, station_id: StationId) -> Option<GasPrices>;

    /// 現在価格を履歴に積み、新しい価格に置き換える
    fn apply_price(&self, station_id: StationId, prices: GasPrices) -> bool;
}

/// パイプラインの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// 価格を生成する間隔
    pub interval: Duration,
    /// 乱数のシード（ステーションIDを足して使う）。None ならOSから
    pub seed: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { interval: Duration::from_secs(10), seed: None }
    }
}

/// 1つのステーションに紐づくジェネレータ/アップデータのペア
///
/// stop() で両方のタスクに停止を伝える。送信側を落としても停止扱いになる。
#[derive(Debug)]
pub struct PricePipeline {
    station_id: StationId,
    stop: watch::Sender<bool>,
    generator: JoinHandle<()>,
    updater: JoinHandle<()>,
}

impl PricePipeline {
    /// ペアを起動する（tokio ランタイムの中で呼ぶこと）
    pub fn spawn<B: PriceBook>(
        book: Weak<B>,
        station_id: StationId,
        settings: &PipelineSettings,
    ) -> Self {
        // 容量1 + 適用完了の返信で、実質的に同期的な受け渡しになる
        let (tx, rx) = mpsc::channel(1);
        let (stop, stop_rx) = watch::channel(false);
        let rng = seeded_rng(settings.seed.map(|seed| seed.wrapping_add(station_id)));

        let generator = tokio::spawn(run_price_generator(
            book.clone(),
            station_id,
            settings.interval,
            rng,
            tx,
            stop_rx.clone(),
        ));
        let updater = tokio::spawn(run_price_updater(book, station_id, rx, stop_rx));

        info!(
            station_id,
            interval_ms = settings.interval.as_millis() as u64,
            "price pipeline started"
        );

        Self { station_id, stop, generator, updater }
    }

    pub fn station_id(&self) -> StationId {
        self.station_id
    }

    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// 両方のタスクが終了しているか
    pub fn is_finished(&self) -> bool {
        self.generator.is_finished() && self.updater.is_finished()
    }

    /// 停止を伝えて、両方のタスクの終了を待つ
    pub async fn shutdown(self) {
        self.stop();
        let station_id = self.station_id;
        for result in futures::future::join_all([self.generator, self.updater]).await {
            if let Err(e) = result {
                warn!(station_id, %e, "price task ended abnormally");
            }
        }
    }
}

/// 停止シグナルを待つ。送信側がドロップされた場合もすぐに返る
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}
