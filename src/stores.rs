//! Store locator.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::like_pattern;
use crate::error::ShopError;
use crate::models::Store;
use crate::schema::stores;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points given in degrees.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct StoreQueryParams {
    pub q: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearby {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreQuery {
    pub q: Option<String>,
    pub nearby: Option<Nearby>,
}

impl From<StoreQueryParams> for StoreQuery {
    fn from(params: StoreQueryParams) -> Self {
        let number = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite())
        };
        let nearby = match (number(&params.lat), number(&params.lng), number(&params.radius)) {
            (Some(lat), Some(lng), Some(radius_km))
                if (-90.0..=90.0).contains(&lat)
                    && (-180.0..=180.0).contains(&lng)
                    && radius_km > 0.0 =>
            {
                Some(Nearby { lat, lng, radius_km })
            }
            _ => None,
        };
        StoreQuery {
            q: params.q.map(|q| q.trim().to_owned()).filter(|q| !q.is_empty()),
            nearby,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct StoreView {
    #[serde(flatten)]
    pub store: Store,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Keeps stores inside the radius and orders them nearest first.
pub fn rank_by_distance(found: Vec<Store>, nearby: &Nearby) -> Vec<StoreView> {
    let mut ranked: Vec<StoreView> = found
        .into_iter()
        .filter_map(|store| {
            let distance = haversine_km(nearby.lat, nearby.lng, store.latitude, store.longitude);
            (distance <= nearby.radius_km).then(|| StoreView {
                store,
                distance_km: Some((distance * 100.0).round() / 100.0),
            })
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

pub fn search_stores(conn: &mut PgConnection, query: &StoreQuery) -> Result<Vec<StoreView>, ShopError> {
    let mut select = stores::table
        .filter(stores::is_active.eq(true))
        .order(stores::name.asc())
        .select(Store::as_select())
        .into_boxed();
    if let Some(q) = &query.q {
        let pattern = like_pattern(q);
        select = select.filter(
            stores::name
                .ilike(pattern.clone())
                .or(stores::city.ilike(pattern.clone()))
                .or(stores::address.ilike(pattern.clone()))
                .or(stores::country.ilike(pattern)),
        );
    }
    let found = select.load(conn)?;

    Ok(match &query.nearby {
        Some(nearby) => rank_by_distance(found, nearby),
        None => found
            .into_iter()
            .map(|store| StoreView {
                store,
                distance_km: None,
            })
            .collect(),
    })
}

pub fn get_store(conn: &mut PgConnection, store_id: i32) -> Result<Store, ShopError> {
    stores::table
        .find(store_id)
        .filter(stores::is_active.eq(true))
        .select(Store::as_select())
        .first(conn)
        .optional()?
        .ok_or(ShopError::NotFound("Store"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn store(id: i32, name: &str, latitude: f64, longitude: f64) -> Store {
        Store {
            id,
            name: name.into(),
            address: String::new(),
            city: String::new(),
            country: "Indonesia".into(),
            latitude,
            longitude,
            store_hours: "09:00-21:00".into(),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Jakarta to Bandung is roughly 116 km as the crow flies.
        let d = haversine_km(-6.2088, 106.8456, -6.9175, 107.6191);
        assert!((d - 116.0).abs() < 3.0, "{d}");
        assert!(haversine_km(1.0, 2.0, 1.0, 2.0).abs() < 1e-9);
    }

    #[test]
    fn nearby_stores_are_nearest_first_and_within_radius() {
        let here = Nearby {
            lat: -6.2088,
            lng: 106.8456,
            radius_km: 50.0,
        };
        let ranked = rank_by_distance(
            vec![
                store(1, "Bekasi", -6.2383, 106.9756),
                store(2, "Bandung", -6.9175, 107.6191),
                store(3, "Central", -6.2000, 106.8400),
            ],
            &here,
        );
        let names: Vec<&str> = ranked.iter().map(|v| v.store.name.as_str()).collect();
        assert_eq!(names, vec!["Central", "Bekasi"]);
        assert!(ranked[0].distance_km.unwrap() < ranked[1].distance_km.unwrap());
    }

    #[test]
    fn location_needs_all_three_parameters() {
        let query = StoreQuery::from(StoreQueryParams {
            q: Some(" jakarta ".into()),
            lat: Some("-6.2".into()),
            lng: Some("106.8".into()),
            radius: None,
        });
        assert_eq!(query.q.as_deref(), Some("jakarta"));
        assert_eq!(query.nearby, None);

        let query = StoreQuery::from(StoreQueryParams {
            q: None,
            lat: Some("-6.2".into()),
            lng: Some("106.8".into()),
            radius: Some("0".into()),
        });
        assert_eq!(query.nearby, None);

        let query = StoreQuery::from(StoreQueryParams {
            q: None,
            lat: Some("-6.2".into()),
            lng: Some("106.8".into()),
            radius: Some("10".into()),
        });
        assert!(query.nearby.is_some());
    }
}
