//! ステーションとユーザーを保持するインメモリのリポジトリ
//!
//! ステーションの集合は1つのロック（StationTable）で守る。
//! 管理操作も価格パイプラインの適用も、すべてこのロックの中で行う。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::CredentialValidator;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    CreateStationDto, FuelType, GasPrices, Location, NearbyStation, PriceHistory, Station,
    StationId, UpdateStationDto, UpdateUserDto, User, UserDto,
};
use crate::pipeline::{PipelineSettings, PriceBook, PricePipeline};
use crate::ranking::{NEAREST_COUNT, nearest};
use crate::users::UserTable;

// =============================================================================
// ステーションテーブル（ロックの内側）
// =============================================================================

struct StationEntry {
    station: Station,
    /// shutdown() で取り出された後は None
    pipeline: Option<PricePipeline>,
}

#[derive(Default)]
struct TableInner {
    next_id: StationId,
    /// 作成順を保つ（一覧と最寄り検索の同順位の並び）
    entries: Vec<StationEntry>,
}

impl TableInner {
    fn entry(&self, id: StationId) -> Option<&StationEntry> {
        self.entries.iter().find(|e| e.station.id == id)
    }

    fn entry_mut(&mut self, id: StationId) -> Option<&mut StationEntry> {
        self.entries.iter_mut().find(|e| e.station.id == id)
    }
}

/// 検証済みの新規ステーション
struct NewStation {
    name: String,
    address: String,
    supported_fuel: Vec<FuelType>,
    location: Location,
    prices: BTreeMap<FuelType, f64>,
}

/// ステーションの集合とそのロック
///
/// 外からはトランザクション単位の操作だけを公開する。
/// ロックの粒度（ステーションごとのロックなど）を変えるときはここだけを触ればよい。
#[derive(Default)]
pub struct StationTable {
    inner: Mutex<TableInner>,
}

impl StationTable {
    fn lock(&self) -> MutexGuard<'_, TableInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// IDを割り当てて保存し、同じクリティカルセクションでパイプラインを起動する
    fn insert(self: &Arc<Self>, draft: NewStation, settings: &PipelineSettings) -> Station {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;

        let station = Station {
            id,
            name: draft.name,
            address: draft.address,
            supported_fuel: draft.supported_fuel,
            location: draft.location,
            current_price: GasPrices::new(draft.prices),
            price_history: Vec::new(),
        };
        let pipeline = PricePipeline::spawn(Arc::downgrade(self), id, settings);
        inner.entries.push(StationEntry { station: station.clone(), pipeline: Some(pipeline) });
        station
    }

    /// 取り除いて、パイプラインに停止を伝える
    fn remove(&self, id: StationId) -> StoreResult<Option<PricePipeline>> {
        let mut inner = self.lock();
        let index = inner
            .entries
            .iter()
            .position(|e| e.station.id == id)
            .ok_or_else(|| StoreError::station_not_found(id))?;
        let entry = inner.entries.remove(index);
        if let Some(pipeline) = &entry.pipeline {
            pipeline.stop();
        }
        Ok(entry.pipeline)
    }

    fn read<R>(&self, id: StationId, f: impl FnOnce(&Station) -> R) -> StoreResult<R> {
        let inner = self.lock();
        let entry = inner.entry(id).ok_or_else(|| StoreError::station_not_found(id))?;
        Ok(f(&entry.station))
    }

    fn modify(
        &self,
        id: StationId,
        f: impl FnOnce(&mut Station) -> StoreResult<()>,
    ) -> StoreResult<Station> {
        let mut inner = self.lock();
        let entry = inner.entry_mut(id).ok_or_else(|| StoreError::station_not_found(id))?;
        f(&mut entry.station)?;
        Ok(entry.station.clone())
    }

    fn all(&self) -> Vec<Station> {
        self.lock().entries.iter().map(|e| e.station.clone()).collect()
    }

    fn nearest(&self, origin: &Location, k: usize) -> Vec<NearbyStation> {
        let inner = self.lock();
        let candidates = inner.entries.iter().map(|e| (&e.station, e.station.location));
        nearest(origin, candidates, k)
            .into_iter()
            .map(|ranked| NearbyStation {
                id: ranked.item.id,
                name: ranked.item.name.clone(),
                address: ranked.item.address.clone(),
                location: ranked.item.location,
                current_price: ranked.item.current_price.prices.clone(),
                distance_km: ranked.distance_km,
            })
            .collect()
    }

    fn take_pipelines(&self) -> Vec<PricePipeline> {
        self.lock().entries.iter_mut().filter_map(|e| e.pipeline.take()).collect()
    }
}

impl PriceBook for StationTable {
    fn current_price(&self, station_id: StationId) -> Option<GasPrices> {
        self.lock().entry(station_id).map(|e| e.station.current_price.clone())
    }

    fn apply_price(&self, station_id: StationId, mut prices: GasPrices) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.entry_mut(station_id) else {
            return false;
        };
        let station = &mut entry.station;

        let before = prices.prices.len();
        prices.prices.retain(|fuel, _| station.supported_fuel.contains(fuel));
        if prices.prices.len() != before {
            warn!(station_id, "dropped prices for fuel the station no longer supports");
        }

        let previous = std::mem::replace(&mut station.current_price, prices);
        station.price_history.push(previous);
        debug!(station_id, history = station.price_history.len(), "applied new prices");
        true
    }
}

// =============================================================================
// リポジトリ（公開API）
// =============================================================================

/// ステーションとユーザーのリポジトリ
///
/// ステーションの作成はパイプラインの起動を伴うので、tokio ランタイムの中で呼ぶこと。
pub struct StationRepository {
    stations: Arc<StationTable>,
    users: UserTable,
    credentials: CredentialValidator,
    settings: PipelineSettings,
}

impl StationRepository {
    pub fn new(settings: PipelineSettings, credentials: CredentialValidator) -> Self {
        Self {
            stations: Arc::new(StationTable::default()),
            users: UserTable::new(),
            credentials,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// 検証して保存し、価格パイプラインを起動する
    pub fn create_station(&self, dto: CreateStationDto) -> StoreResult<Station> {
        let supported_fuel = parse_fuels(&dto.supported_fuel)?;
        validate_location(&dto.location)?;
        let prices = parse_prices(&dto.prices, &supported_fuel)?;

        let station = self.stations.insert(
            NewStation {
                name: dto.name,
                address: dto.address,
                supported_fuel,
                location: dto.location,
                prices,
            },
            &self.settings,
        );
        info!(station_id = station.id, name = %station.name, "station created");
        Ok(station)
    }

    /// 削除と同時にパイプラインを止める
    pub fn delete_station(&self, id: StationId) -> StoreResult<()> {
        self.stations.remove(id)?;
        info!(station_id = id, "station deleted");
        Ok(())
    }

    /// 名前・住所・対応燃料・位置をまとめて置き換える（価格と履歴はそのまま）
    pub fn update_station(&self, dto: UpdateStationDto) -> StoreResult<Station> {
        let supported_fuel = parse_fuels(&dto.supported_fuel)?;
        validate_location(&dto.location)?;

        self.stations.modify(dto.id, |station| {
            // 現在価格の燃料は新しい対応燃料にも含まれていなければならない
            if let Some(fuel) =
                station.current_price.prices.keys().find(|fuel| !supported_fuel.contains(fuel))
            {
                return Err(StoreError::FuelNotSupported(*fuel));
            }
            station.name = dto.name;
            station.address = dto.address;
            station.supported_fuel = supported_fuel;
            station.location = dto.location;
            Ok(())
        })
    }

    pub fn stations(&self) -> Vec<Station> {
        self.stations.all()
    }

    pub fn station(&self, id: StationId) -> StoreResult<Station> {
        self.stations.read(id, Station::clone)
    }

    /// 1種類の燃料の価格履歴
    ///
    /// 判定の順番: ステーションがない → 燃料が不正 → 扱っていない燃料
    pub fn price_history(&self, id: StationId, fuel: &str) -> StoreResult<PriceHistory> {
        self.stations.read(id, |station| {
            let fuel: FuelType = fuel.parse()?;
            if !station.supports(fuel) {
                return Err(StoreError::FuelNotSupported(fuel));
            }
            let history_prices = station
                .price_history
                .iter()
                .filter_map(|snapshot| snapshot.prices.get(&fuel).map(|price| (snapshot.time, *price)))
                .collect();
            Ok(PriceHistory { history_prices })
        })?
    }

    /// 最寄りの3件（近い順）
    pub fn nearest_stations(&self, location: &Location) -> StoreResult<Vec<NearbyStation>> {
        validate_location(location)?;
        Ok(self.stations.nearest(location, NEAREST_COUNT))
    }

    /// すべてのパイプラインを止め、タスクの終了を待つ
    pub async fn shutdown(&self) {
        let pipelines = self.stations.take_pipelines();
        info!(count = pipelines.len(), "stopping price pipelines");
        futures::future::join_all(pipelines.into_iter().map(PricePipeline::shutdown)).await;
    }

    // -------------------------------------------------------------------------
    // ユーザー
    // -------------------------------------------------------------------------

    pub fn create_user(&self, dto: UserDto) -> StoreResult<User> {
        let password_hash = self.hash_password(&dto.password)?;
        let user = self.users.insert(User {
            id: Uuid::new_v4(),
            username: dto.username,
            email: dto.email,
            password_hash,
        })?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        self.users.remove(id)?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// パスワードも平文のまま保存せず、ハッシュし直す
    pub fn update_user(&self, dto: UpdateUserDto) -> StoreResult<User> {
        let password_hash = self.hash_password(&dto.password)?;
        self.users.replace(User {
            id: dto.id,
            username: dto.username,
            email: dto.email,
            password_hash,
        })
    }

    pub fn users(&self) -> Vec<User> {
        self.users.all()
    }

    pub fn user(&self, id: Uuid) -> StoreResult<User> {
        self.users.by_id(id)
    }

    pub fn user_by_email(&self, email: &str) -> StoreResult<User> {
        self.users.by_email(email)
    }

    /// メールアドレスとパスワードが一致すればそのユーザー
    pub fn authenticate(&self, email: &str, password: &str) -> Option<User> {
        let user = self.users.by_email(email).ok()?;
        self.credentials.verify(&user.password_hash, password).then_some(user)
    }

    fn hash_password(&self, password: &str) -> StoreResult<String> {
        if password.is_empty() {
            return Err(StoreError::Validation("password must not be empty".into()));
        }
        self.credentials.hash(password).map_err(|e| StoreError::Credential(e.to_string()))
    }
}

// =============================================================================
// 入力の検証
// =============================================================================

/// 空は不可。重複は最初の1つだけ残す
fn parse_fuels(literals: &[String]) -> StoreResult<Vec<FuelType>> {
    if literals.is_empty() {
        return Err(StoreError::Validation("supported_fuel must not be empty".into()));
    }
    let mut fuels = Vec::with_capacity(literals.len());
    for literal in literals {
        let fuel: FuelType = literal.parse()?;
        if !fuels.contains(&fuel) {
            fuels.push(fuel);
        }
    }
    Ok(fuels)
}

fn validate_location(location: &Location) -> StoreResult<()> {
    if location.is_valid() {
        Ok(())
    } else {
        Err(StoreError::Validation(format!(
            "location out of range: latitude {}, longitude {}",
            location.latitude, location.longitude
        )))
    }
}

fn parse_prices(
    prices: &HashMap<String, f64>,
    supported: &[FuelType],
) -> StoreResult<BTreeMap<FuelType, f64>> {
    let mut parsed = BTreeMap::new();
    for (literal, price) in prices {
        let fuel: FuelType = literal.parse()?;
        if !supported.contains(&fuel) {
            return Err(StoreError::InvalidFuelType(literal.clone()));
        }
        // NaN もここで弾く
        if !(*price >= 0.0) {
            return Err(StoreError::NegativePrice { fuel, price: *price });
        }
        if !price.is_finite() {
            return Err(StoreError::Validation(format!("price for {fuel} must be finite")));
        }
        parsed.insert(fuel, *price);
    }
    Ok(parsed)
}
