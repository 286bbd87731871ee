//! Provider Adapter (C9) and its shared wire types (spec §4.9/§6). Each
//! concrete adapter (`stib`, `delijn`, `bkk`) implements [`ProviderAdapter`]
//! against the normalized model below; the registry/dispatcher (`crate::registry`,
//! C10) is the only caller that sees this trait directly.

pub mod bkk;
mod common;
pub mod delijn;
mod protobuf_scan;
pub mod stib;

pub use common::ProviderCommon;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use crate::gtfs::feed::Stop;
use crate::gtfs::query::{RouteServing, ScheduledArrival, StopsInBbox, TripSegment};
use crate::gtfs::translations::Resolved;
use crate::gtfs::vehicle::VehiclePosition as ReconstructedVehiclePosition;

/// Which capability an adapter may or may not implement (spec §4.9: "Not
/// every adapter implements every operation; the Registry advertises the
/// available set").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    WaitingTimes,
    Vehicles,
    ServiceMessages,
    Route,
    Colors,
    NearestStop,
    StopByName,
    TripsBetween,
    StationsInBbox,
    DestinationsFrom,
    OriginsTo,
    RoutesServing,
    ScheduleWaitingTimes,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::WaitingTimes => "waiting_times",
            Endpoint::Vehicles => "vehicles",
            Endpoint::ServiceMessages => "service_messages",
            Endpoint::Route => "route",
            Endpoint::Colors => "colors",
            Endpoint::NearestStop => "nearest_stop",
            Endpoint::StopByName => "stop_by_name",
            Endpoint::TripsBetween => "trips_between",
            Endpoint::StationsInBbox => "stations_in_bbox",
            Endpoint::DestinationsFrom => "destinations_from",
            Endpoint::OriginsTo => "origins_to",
            Endpoint::RoutesServing => "routes_serving",
            Endpoint::ScheduleWaitingTimes => "schedule_waiting_times",
        }
    }
}

fn unsupported(provider: &str, endpoint: Endpoint) -> AppError {
    AppError::NotFound(format!("provider {provider:?} does not implement endpoint {:?}", endpoint.name()))
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageMetadata {
    pub selected: Option<String>,
    pub requested: String,
    pub fallback_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<Resolved> for LanguageMetadata {
    fn from(r: Resolved) -> Self {
        Self {
            selected: r.selected_language,
            requested: r.requested_language,
            fallback_chain: r.fallback_chain,
            warning: r.warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct StopMetadata {
    /// `"api"` | `"gtfs"` | `"cache"`.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl From<(f64, f64)> for Coordinates {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StopWire {
    pub id: String,
    pub name: String,
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translations: Option<HashMap<String, String>>,
    #[serde(rename = "_metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StopMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrivalMetadata {
    pub language: LanguageMetadata,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitingTimeEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_minutes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_minutes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
    pub is_realtime: bool,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "_metadata")]
    pub metadata: ArrivalMetadata,
}

/// `route_id -> { "_metadata": .., headsign -> [entry, ..] }` (spec §4.9).
#[derive(Debug, Clone, Serialize, Default)]
pub struct LineWaitingTimes {
    #[serde(rename = "_metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub by_headsign: HashMap<String, Vec<WaitingTimeEntry>>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct StopWaitingTimes {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translations: Option<HashMap<String, String>>,
    #[serde(rename = "_metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StopMetadata>,
    pub lines: HashMap<String, LineWaitingTimes>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct WaitingTimesResponse {
    pub stops_data: HashMap<String, StopWaitingTimes>,
    #[serde(rename = "_metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Marks a response as served from the in-process stale cache because the
/// rate limiter reported quota exhaustion (spec §5 back-pressure rule, §8
/// "Rate-limited adapter" property: `_metadata.cached=true`, zero outbound calls).
pub fn mark_cached(metadata: &mut Option<Value>) {
    *metadata = Some(serde_json::json!({ "cached": true }));
}

/// Public wire shape for a reconstructed vehicle position. `shape_segment`
/// stays `[lon, lat]` (GeoJSON order); `interpolated_position` stays
/// `[lat, lon]` — spec §6/§9's documented, intentional asymmetry.
#[derive(Debug, Clone, Serialize)]
pub struct VehiclePositionWire {
    pub line: String,
    pub direction: Option<u8>,
    pub current_segment: (Option<String>, String),
    pub distance_to_next: f64,
    pub segment_length: f64,
    pub is_valid: bool,
    pub interpolated_position: Option<(f64, f64)>,
    pub bearing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_segment: Option<Vec<(f64, f64)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
}

impl From<ReconstructedVehiclePosition> for VehiclePositionWire {
    fn from(p: ReconstructedVehiclePosition) -> Self {
        Self {
            line: p.line,
            direction: p.direction,
            current_segment: (p.from_stop, p.to_stop),
            distance_to_next: p.distance_to_next_m,
            segment_length: p.segment_length_m,
            is_valid: p.is_valid,
            interpolated_position: p.interpolated_latlon,
            bearing: p.bearing_deg,
            shape_segment: p.shape_segment,
            raw_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VehiclesResponse {
    pub vehicles: Vec<VehiclePositionWire>,
    #[serde(rename = "_metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceMessageWire {
    pub text: String,
    #[serde(rename = "_metadata")]
    pub metadata: ArrivalMetadata,
    pub lines: Vec<String>,
    pub points: Vec<String>,
    pub stops: Vec<String>,
    pub priority: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_monitored: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ServiceMessagesResponse {
    pub messages: Vec<ServiceMessageWire>,
    #[serde(rename = "_metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteVariantWire {
    pub direction_id: Option<u8>,
    pub destination: Option<String>,
    pub stops: Vec<StopWire>,
    /// `[lon, lat]` pairs, GeoJSON order (spec §6).
    pub shape: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteResponse {
    pub line: Vec<RouteVariantWire>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Colors {
    pub background: String,
    pub background_border: String,
    pub text: String,
    pub text_border: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            background_border: "#000000".to_string(),
            text: "#FFFFFF".to_string(),
            text_border: "#FFFFFF".to_string(),
        }
    }
}

/// The fixed capability interface every provider adapter implements against
/// (spec §9 REDESIGN FLAGS: replaces the original's duck-typed per-adapter
/// endpoint dict). Endpoints an adapter doesn't support keep the default
/// implementation, which surfaces a uniform 404 rather than panicking or
/// being absent from dispatch.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn config(&self) -> &ProviderConfig;
    fn capabilities(&self) -> &'static [Endpoint];

    /// Shared infrastructure (rate limiter, caches, the adapter's GTFS
    /// [`Feed`](crate::gtfs::feed::Feed) handle) every adapter owns one of.
    /// The C11 schedule-query endpoints below are feed-only, so their
    /// default implementations only need this accessor, not a per-adapter
    /// override.
    fn common(&self) -> &ProviderCommon;

    async fn waiting_times(&self, _stop_id: Option<&str>, _language: Option<&str>) -> AppResult<WaitingTimesResponse> {
        Err(unsupported(self.name(), Endpoint::WaitingTimes))
    }

    async fn vehicles(&self, _line: Option<&str>, _direction: Option<&str>) -> AppResult<VehiclesResponse> {
        Err(unsupported(self.name(), Endpoint::Vehicles))
    }

    async fn service_messages(
        &self,
        _monitored_lines: Option<&[String]>,
        _monitored_stops: Option<&[String]>,
    ) -> AppResult<ServiceMessagesResponse> {
        Err(unsupported(self.name(), Endpoint::ServiceMessages))
    }

    async fn route(&self, _line: &str) -> AppResult<RouteResponse> {
        Err(unsupported(self.name(), Endpoint::Route))
    }

    async fn colors(&self, _line: &str) -> AppResult<Colors> {
        Err(unsupported(self.name(), Endpoint::Colors))
    }

    async fn nearest_stop(&self, _lat: f64, _lon: f64, _limit: usize, _max_distance_km: f64) -> AppResult<Vec<StopWire>> {
        Err(unsupported(self.name(), Endpoint::NearestStop))
    }

    async fn stop_by_name(&self, _query: &str, _limit: usize) -> AppResult<Vec<StopWire>> {
        Err(unsupported(self.name(), Endpoint::StopByName))
    }

    /// Schedule Query Engine (C11, spec §4.11): read-only lookups against
    /// this adapter's shared GTFS snapshot. Every adapter carries a feed, so
    /// these have one shared default implementation rather than a per-adapter
    /// override; an adapter can still shadow one if it ever needs to.
    async fn find_trips_between(&self, start_id: &str, end_id: &str, date: Option<chrono::NaiveDate>) -> AppResult<Vec<TripSegment>> {
        let snapshot = self.common().snapshot()?;
        Ok(crate::gtfs::query::find_trips_between(&snapshot, start_id, end_id, date))
    }

    async fn stations_in_bbox(&self, min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64, count_only: bool) -> AppResult<StopsInBbox> {
        let snapshot = self.common().snapshot()?;
        Ok(crate::gtfs::query::stations_in_bbox(&snapshot, min_lat, min_lon, max_lat, max_lon, count_only))
    }

    async fn destinations_from(&self, stop_id: &str) -> AppResult<Vec<Stop>> {
        let snapshot = self.common().snapshot()?;
        Ok(crate::gtfs::query::reachable_stops(&snapshot, stop_id, true))
    }

    async fn origins_to(&self, stop_id: &str) -> AppResult<Vec<Stop>> {
        let snapshot = self.common().snapshot()?;
        Ok(crate::gtfs::query::reachable_stops(&snapshot, stop_id, false))
    }

    async fn routes_serving(&self, stop_id: &str) -> AppResult<Vec<RouteServing>> {
        let snapshot = self.common().snapshot()?;
        Ok(crate::gtfs::query::routes_serving(&snapshot, stop_id))
    }

    async fn schedule_waiting_times(
        &self,
        stop_id: &str,
        at_date: chrono::NaiveDate,
        at_seconds_since_midnight: u32,
        route_id: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<ScheduledArrival>> {
        let snapshot = self.common().snapshot()?;
        Ok(crate::gtfs::query::waiting_times_from_schedule(&snapshot, stop_id, at_date, at_seconds_since_midnight, route_id, limit))
    }
}

/// Normalizes a GTFS route color to `#RRGGBB` uppercase, defaulting to
/// `#000000`/`#FFFFFF` when absent (spec §4.9/§7 "missing colors").
pub fn normalize_color(raw: &str, default: &str) -> String {
    let trimmed = raw.trim_start_matches('#');
    if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{}", trimmed.to_uppercase())
    } else {
        default.to_string()
    }
}

/// `"N'"` rendering for a minute count (spec §6 `scheduled_minutes`/`realtime_minutes`).
pub fn minutes_label(minutes: i64) -> String {
    format!("{minutes}'")
}
