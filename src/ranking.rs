//! 最寄りステーションの選択（大円距離 + 上位k件の選択）

use crate::models::Location;

/// 地球の半径 (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 最寄り検索で返す件数
pub const NEAREST_COUNT: usize = 3;

/// 2地点間の大円距離 (km, ハーバサイン公式)
///
/// ```
/// use fuel_price_engine::models::Location;
/// use fuel_price_engine::ranking::distance_km;
///
/// let berlin = Location::new(52.52, 13.405);
/// let paris = Location::new(48.8566, 2.3522);
/// let d = distance_km(&berlin, &paris);
/// assert!((d - 878.0).abs() < 5.0);
/// assert_eq!(distance_km(&paris, &paris), 0.0);
/// ```
pub fn distance_km(a: &Location, b: &Location) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // 丸め誤差で 1 をわずかに超えると asin が NaN になる
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// 距離付きの候補
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub distance_km: f64,
    seq: usize,
}

/// origin に近い順に最大 k 件を返す
///
/// 大きさ k のバッファを保ち、満杯なら「バッファ内で最も遠いもの」より近い候補だけが
/// それと入れ替わる。同じ距離なら先に来た候補が残る。
pub fn nearest<T, I>(origin: &Location, candidates: I, k: usize) -> Vec<Ranked<T>>
where
    I: IntoIterator<Item = (T, Location)>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut best: Vec<Ranked<T>> = Vec::with_capacity(k);

    for (seq, (item, location)) in candidates.into_iter().enumerate() {
        let distance_km = distance_km(origin, &location);
        let candidate = Ranked { item, distance_km, seq };

        if best.len() < k {
            best.push(candidate);
            continue;
        }

        let farthest = farthest_index(&best);
        if distance_km < best[farthest].distance_km {
            best[farthest] = candidate;
        }
    }

    best.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km).then(a.seq.cmp(&b.seq)));
    best
}

/// 最も遠い要素の位置（同距離なら後から来たもの）
fn farthest_index<T>(best: &[Ranked<T>]) -> usize {
    let mut farthest = 0;
    for (i, entry) in best.iter().enumerate().skip(1) {
        let current = &best[farthest];
        let farther = entry.distance_km > current.distance_km
            || (entry.distance_km == current.distance_km && entry.seq > current.seq);
        if farther {
            farthest = i;
        }
    }
    farthest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farthest_prefers_later_on_tie() {
        let best = vec![
            Ranked { item: 'a', distance_km: 5.0, seq: 0 },
            Ranked { item: 'b', distance_km: 5.0, seq: 3 },
            Ranked { item: 'c', distance_km: 1.0, seq: 2 },
        ];
        assert_eq!(farthest_index(&best), 1);
    }

    #[test]
    fn replaces_the_farthest_not_the_first_farther() {
        // 先頭より近いだけの候補で先頭を潰すと、遠い要素が残ってしまう
        let origin = Location::new(0.0, 0.0);
        let candidates = vec![
            ('a', Location::new(0.0, 2.0)),
            ('b', Location::new(0.0, 9.0)),
            ('c', Location::new(0.0, 5.0)),
            ('d', Location::new(0.0, 1.0)),
        ];
        let picked: Vec<char> = nearest(&origin, candidates, 3).into_iter().map(|r| r.item).collect();
        assert_eq!(picked, vec!['d', 'a', 'c']);
    }
}
