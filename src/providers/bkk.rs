//! BKK (Budapest) adapter: GTFS-Realtime **protobuf** vehicle positions and
//! alerts, grounded in the original's `transit_providers/hu/bkk/api.py`
//! (`get_vehicle_positions`, `get_service_alerts`) and in
//! `KingOfBread-miner-omniviv`'s `providers/timetables/gtfs/realtime.rs` for
//! the `gtfs_realtime`/`prost` decode path itself — the STIB/De Lijn adapters
//! never touch a binary feed, so this is the one place that crate earns its
//! keep. Waiting times fall back to the schedule (C11) the way the other
//! adapters use real-time APIs, since BKK's only real-time surface covered
//! here is positions/alerts.
//!
//! BKK's vendor extension fields on `VehiclePosition` (door status, vehicle
//! type, odometer-derived stop distance) sit outside the standard GTFS-RT
//! schema; `prost` silently drops them on a typed decode. We keep the raw
//! entity bytes around just long enough to recover them with
//! [`super::protobuf_scan`] and expose them under `bkk_specific` on the wire,
//! never blocking on BKK evolving its extension schema (spec §9 "protobuf
//! extension fields" redesign flag).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use prost::Message as _;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use crate::gtfs::feed::FeedSnapshot;
use crate::gtfs::vehicle::{self, DirectionKey, VehicleTelemetry};

use super::protobuf_scan;
use super::{
    normalize_color, ArrivalMetadata, Colors, Coordinates, Endpoint, LanguageMetadata, ProviderAdapter,
    ProviderCommon, RouteResponse, RouteVariantWire, ServiceMessageWire, ServiceMessagesResponse, StopMetadata,
    StopWire, VehiclePositionWire, VehiclesResponse,
};

const CAPABILITIES: &[Endpoint] = &[
    Endpoint::Vehicles,
    Endpoint::ServiceMessages,
    Endpoint::Route,
    Endpoint::Colors,
    Endpoint::NearestStop,
    Endpoint::StopByName,
    Endpoint::TripsBetween,
    Endpoint::StationsInBbox,
    Endpoint::DestinationsFrom,
    Endpoint::OriginsTo,
    Endpoint::RoutesServing,
    Endpoint::ScheduleWaitingTimes,
];

/// Field numbers `gtfs_realtime::VehiclePosition` decodes itself; anything
/// else recovered by `protobuf_scan` from the same raw submessage is a BKK
/// extension.
const VEHICLE_POSITION_KNOWN_FIELDS: &[u32] = &[1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Bound on the trip_id -> headsign cache (spec §4.9 "an LRU policy bounds
/// memory when monitoring a subset of lines inside a national feed" — BKK's
/// static bundle covers all of Budapest even when only a handful of lines are
/// monitored).
const HEADSIGN_CACHE_CAPACITY: usize = 2048;

/// A tiny insertion-order LRU: evicts the least recently touched entry once
/// over capacity. Good enough for a cache this small; no need for a crate.
struct HeadsignCache {
    capacity: usize,
    order: Vec<String>,
    entries: HashMap<String, String>,
}

impl HeadsignCache {
    fn new(capacity: usize) -> Self {
        Self { capacity, order: Vec::new(), entries: HashMap::new() }
    }

    fn get_or_insert_with(&mut self, trip_id: &str, compute: impl FnOnce() -> String) -> String {
        if let Some(value) = self.entries.get(trip_id) {
            let value = value.clone();
            self.touch(trip_id);
            return value;
        }

        let value = compute();
        if self.entries.len() >= self.capacity {
            if !self.order.is_empty() {
                let oldest = self.order.remove(0);
                self.entries.remove(&oldest);
            }
        }
        self.order.push(trip_id.to_string());
        self.entries.insert(trip_id.to_string(), value.clone());
        value
    }

    fn touch(&mut self, trip_id: &str) {
        if let Some(pos) = self.order.iter().position(|id| id == trip_id) {
            let id = self.order.remove(pos);
            self.order.push(id);
        }
    }
}

pub struct BkkAdapter {
    common: ProviderCommon,
    headsigns: Mutex<HeadsignCache>,
}

impl BkkAdapter {
    pub fn new(common: ProviderCommon) -> Self {
        Self { common, headsigns: Mutex::new(HeadsignCache::new(HEADSIGN_CACHE_CAPACITY)) }
    }

    /// Trip headsign for `trip_id`, falling back to the last stop's name when
    /// the trip is unknown to the static bundle (spec §4.9 GTFS-RT adapters).
    fn headsign_for_trip(&self, snapshot: &FeedSnapshot, trip_id: &str) -> String {
        let mut cache = self.headsigns.lock().unwrap();
        cache.get_or_insert_with(trip_id, || {
            let trip = snapshot.trips_by_id.get(trip_id);
            if let Some(headsign) = trip.and_then(|t| t.headsign.clone()) {
                return headsign;
            }
            let last_stop_name = trip
                .and_then(|t| snapshot.stop_times_by_trip.get(&t.id))
                .and_then(|sts| sts.last())
                .and_then(|st| snapshot.stops_by_id.get(&st.stop_id))
                .map(|s| s.name.clone());
            last_stop_name.unwrap_or_else(|| trip_id.to_string())
        })
    }

    async fn fetch_feed(&self) -> AppResult<(gtfs_realtime::FeedMessage, bytes::Bytes)> {
        let url = self
            .common
            .config
            .gtfs_realtime_url
            .clone()
            .ok_or_else(|| AppError::Config("BKK_GTFS_REALTIME_URL is not configured".to_string()))?;
        let api_key = self.common.config.api_key.clone().unwrap_or_default();

        self.common.before_upstream_call().await;
        let response = self.common.http.get(&url).query(&[("key", api_key.as_str())]).send().await?;
        self.common.rate_limiter.update_from_headers(response.headers());
        let bytes = response.bytes().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

        let feed = gtfs_realtime::FeedMessage::decode(bytes.as_ref()).map_err(|e| AppError::UpstreamSchema(e.to_string()))?;
        Ok((feed, bytes))
    }

    /// BKK extension fields recovered from the raw entity bytes for the
    /// vehicle whose typed `id` is `vehicle_id`, or `None` when nothing beyond
    /// the standard schema is present.
    fn bkk_specific_fields(raw_feed_bytes: &[u8], vehicle_id: &str) -> Option<Value> {
        for entity_bytes in protobuf_scan::submessages(raw_feed_bytes, 2) {
            for vehicle_bytes in protobuf_scan::submessages(entity_bytes, 4) {
                let matches_vehicle = protobuf_scan::submessages(vehicle_bytes, 2)
                    .into_iter()
                    .flat_map(|descriptor| protobuf_scan::fields(descriptor))
                    .any(|f| f.number == 1 && f.as_string().as_deref() == Some(vehicle_id));
                if !matches_vehicle {
                    continue;
                }

                let unknown = protobuf_scan::unknown_fields(vehicle_bytes, VEHICLE_POSITION_KNOWN_FIELDS);
                if unknown.is_empty() {
                    return None;
                }
                let map: serde_json::Map<String, Value> = unknown
                    .iter()
                    .map(|f| {
                        let value = f.as_string().map(Value::String).unwrap_or_else(|| {
                            f.as_varint().map(|v| json!(v)).unwrap_or_else(|| f.as_f32().map(|v| json!(v)).unwrap_or(Value::Null))
                        });
                        (format!("field_{}", f.number), value)
                    })
                    .collect();
                return Some(Value::Object(map));
            }
        }
        None
    }
}

#[async_trait]
impl ProviderAdapter for BkkAdapter {
    fn name(&self) -> &str {
        "bkk"
    }

    fn config(&self) -> &ProviderConfig {
        &self.common.config
    }

    fn capabilities(&self) -> &'static [Endpoint] {
        CAPABILITIES
    }

    fn common(&self) -> &ProviderCommon {
        &self.common
    }

    async fn vehicles(&self, line: Option<&str>, direction: Option<&str>) -> AppResult<VehiclesResponse> {
        let memo_key = format!("{}:{}", line.unwrap_or("*"), direction.unwrap_or("*"));
        if let Some(cached) = self.common.vehicles_memo.get(&memo_key) {
            return Ok(cached);
        }
        if !self.common.rate_limiter.can_make_request() {
            if let Some(mut stale) = self.common.vehicles_memo.get_stale(&memo_key) {
                log::warn!("bkk rate limit exhausted, serving stale vehicle positions");
                super::mark_cached(&mut stale.metadata);
                return Ok(stale);
            }
            return Ok(VehiclesResponse { vehicles: Vec::new(), metadata: None });
        }

        let (feed, raw_bytes) = self.fetch_feed().await?;
        let snapshot = self.common.snapshot()?;

        let mut vehicles = Vec::new();
        for entity in &feed.entity {
            let Some(vp) = &entity.vehicle else { continue };
            let Some(trip) = &vp.trip else { continue };
            let Some(route_id) = &trip.route_id else { continue };
            if let Some(wanted) = line {
                if route_id != wanted {
                    continue;
                }
            }

            let direction_key = match trip.direction_id {
                Some(id) => DirectionKey::Id(id as u8),
                None => match &trip.trip_id {
                    Some(trip_id) => DirectionKey::Headsign(self.headsign_for_trip(&snapshot, trip_id)),
                    None => continue,
                },
            };
            let resolved_direction = vehicle::resolve_direction(&snapshot, route_id, &direction_key);
            if let Some(wanted) = direction {
                if resolved_direction.map(|d| d.to_string()) != Some(wanted.to_string()) {
                    continue;
                }
            }

            let Some(stop_id) = vp.stop_id.clone() else { continue };

            let telemetry = VehicleTelemetry {
                provider: "bkk".to_string(),
                line_id: route_id.clone(),
                direction: direction_key,
                next_stop_id: stop_id,
                // BKK reports an absolute position, not a next-stop distance;
                // reconstruction still runs to pick the correct shape segment,
                // but the caller should read `interpolated_position` as
                // informational only when `position` is present below.
                distance_to_next_stop_m: 0.0,
                delay_seconds: None,
            };

            let mut wire = VehiclePositionWire::from(vehicle::reconstruct(&snapshot, &telemetry));

            if let Some(position) = &vp.position {
                wire.interpolated_position = Some((position.latitude as f64, position.longitude as f64));
                wire.bearing = position.bearing.map(f64::from).or(wire.bearing);
                wire.is_valid = true;
            }

            let vehicle_id = vp.vehicle.as_ref().and_then(|v| v.id.clone());
            let bkk_specific = vehicle_id.as_deref().and_then(|id| Self::bkk_specific_fields(&raw_bytes, id));

            wire.raw_data = Some(json!({
                "vehicle_id": vehicle_id,
                "trip_id": trip.trip_id,
                "bkk_specific": bkk_specific,
            }));

            vehicles.push(wire);
        }

        let result = VehiclesResponse { vehicles, metadata: None };
        self.common.vehicles_memo.set(memo_key, result.clone());
        Ok(result)
    }

    async fn service_messages(
        &self,
        monitored_lines: Option<&[String]>,
        monitored_stops: Option<&[String]>,
    ) -> AppResult<ServiceMessagesResponse> {
        let memo_key = "messages";
        if let Some(cached) = self.common.messages_memo.get(memo_key) {
            return Ok(cached);
        }
        if !self.common.rate_limiter.can_make_request() {
            if let Some(mut stale) = self.common.messages_memo.get_stale(memo_key) {
                super::mark_cached(&mut stale.metadata);
                return Ok(stale);
            }
            return Ok(ServiceMessagesResponse { messages: Vec::new(), metadata: None });
        }

        let (feed, _raw_bytes) = self.fetch_feed().await?;
        let snapshot = self.common.snapshot()?;

        let mut messages = Vec::new();
        for entity in &feed.entity {
            let Some(alert) = &entity.alert else { continue };

            let text = alert
                .description_text
                .as_ref()
                .or(alert.header_text.as_ref())
                .and_then(|t| t.translation.first())
                .map(|t| t.text.clone())
                .unwrap_or_default();
            if text.is_empty() {
                continue;
            }

            let affected_lines: Vec<String> =
                alert.informed_entity.iter().filter_map(|e| e.route_id.clone()).collect();
            let affected_stop_ids: Vec<String> =
                alert.informed_entity.iter().filter_map(|e| e.stop_id.clone()).collect();
            let stop_names: Vec<String> = affected_stop_ids
                .iter()
                .map(|id| ProviderCommon::gtfs_stop_name(&snapshot, id).unwrap_or_else(|| id.clone()))
                .collect();

            let is_monitored = monitored_lines.map(|lines| lines.iter().any(|l| affected_lines.contains(l))).unwrap_or(false)
                || monitored_stops.map(|stops| stops.iter().any(|s| affected_stop_ids.contains(s))).unwrap_or(false);

            messages.push(ServiceMessageWire {
                text,
                metadata: ArrivalMetadata {
                    language: LanguageMetadata {
                        selected: Some("hu".to_string()),
                        requested: "hu".to_string(),
                        fallback_chain: vec!["hu".to_string()],
                        warning: None,
                    },
                    cached: false,
                },
                lines: affected_lines,
                points: affected_stop_ids,
                stops: stop_names,
                priority: 0,
                kind: format!("{:?}", alert.cause.unwrap_or(1)),
                is_monitored,
            });
        }

        let result = ServiceMessagesResponse { messages, metadata: None };
        self.common.messages_memo.set(memo_key, result.clone());
        Ok(result)
    }

    async fn route(&self, line: &str) -> AppResult<RouteResponse> {
        let snapshot = self.common.snapshot()?;
        let variants = snapshot.route_variants.get(line).cloned().unwrap_or_default();
        if variants.is_empty() {
            return Err(AppError::NotFound(format!("unknown line {line:?}")));
        }

        let mut line_variants = Vec::new();
        for variant in variants {
            let stops = variant
                .stop_ids
                .iter()
                .map(|id| {
                    let coords = snapshot.stops_by_id.get(id).and_then(|s| s.coordinates).map(Coordinates::from);
                    let name = ProviderCommon::gtfs_stop_name(&snapshot, id).unwrap_or_else(|| id.clone());
                    StopWire {
                        id: id.clone(),
                        name,
                        coordinates: coords,
                        translations: snapshot.translations.for_stop(id).cloned(),
                        metadata: Some(StopMetadata { source: "gtfs".to_string(), warning: None }),
                    }
                })
                .collect();

            let shape = variant
                .shape_id
                .as_deref()
                .and_then(|id| snapshot.shape_points(id))
                .map(|points| points.iter().map(|(lat, lon)| (*lon, *lat)).collect())
                .unwrap_or_default();

            line_variants.push(RouteVariantWire {
                direction_id: variant.direction_id,
                destination: variant.destination.clone(),
                stops,
                shape,
            });
        }

        Ok(RouteResponse { line: line_variants })
    }

    async fn colors(&self, line: &str) -> AppResult<Colors> {
        let snapshot = self.common.snapshot()?;
        let route = snapshot.routes_by_id.get(line).ok_or_else(|| AppError::NotFound(format!("unknown line {line:?}")))?;
        Ok(Colors {
            background: normalize_color(&route.color, "#000000"),
            background_border: normalize_color(&route.color, "#000000"),
            text: normalize_color(&route.text_color, "#FFFFFF"),
            text_border: normalize_color(&route.text_color, "#FFFFFF"),
        })
    }

    async fn nearest_stop(&self, lat: f64, lon: f64, limit: usize, max_distance_km: f64) -> AppResult<Vec<StopWire>> {
        let snapshot = self.common.snapshot()?;
        let found = crate::gtfs::search::nearest_stops(&snapshot, lat, lon, limit, max_distance_km)?;
        Ok(found
            .into_iter()
            .map(|n| StopWire {
                id: n.stop.id.clone(),
                name: n.stop.name.clone(),
                coordinates: n.stop.coordinates.map(Coordinates::from),
                translations: snapshot.translations.for_stop(&n.stop.id).cloned(),
                metadata: Some(StopMetadata { source: "gtfs".to_string(), warning: None }),
            })
            .collect())
    }

    async fn stop_by_name(&self, query: &str, limit: usize) -> AppResult<Vec<StopWire>> {
        let snapshot = self.common.snapshot()?;
        let found = crate::gtfs::search::stops_by_name(&snapshot, query, limit);
        Ok(found
            .into_iter()
            .map(|s| StopWire {
                translations: snapshot.translations.for_stop(&s.id).cloned(),
                coordinates: s.coordinates.map(Coordinates::from),
                id: s.id,
                name: s.name,
                metadata: Some(StopMetadata { source: "gtfs".to_string(), warning: None }),
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn config() -> ProviderConfig {
        ProviderConfig {
            name: "bkk".to_string(),
            api_url: None,
            api_key: None,
            gtfs_url: None,
            gtfs_realtime_url: Some("https://example.invalid/realtime".to_string()),
            monitored_lines: vec!["1".to_string()],
            stop_ids: vec![],
            rate_limit_delay: Duration::from_secs(10),
            gtfs_cache_ttl: Duration::from_secs(3600),
            available_languages: vec!["hu".to_string()],
            default_timezone: "Europe/Budapest".to_string(),
        }
    }

    /// Mirrors the STIB/De Lijn rate-limited fallback test: once the quota is
    /// known exhausted, `service_messages()` returns the memoized value
    /// annotated `_metadata.cached=true` without decoding a fresh feed.
    #[tokio::test]
    async fn service_messages_serves_stale_memo_with_cached_marker_when_rate_limited() {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

        let cache_dir = tempfile::tempdir().unwrap();
        let feed = crate::test_utils::fixture_feed();
        let common = ProviderCommon::new(config(), cache_dir.path(), feed);
        let adapter = BkkAdapter::new(common);

        let previous = ServiceMessagesResponse { messages: Vec::new(), metadata: None };
        adapter.common.messages_memo.set("messages", previous);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from_static("0"));
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), HeaderValue::from_static("60"));
        adapter.common.rate_limiter.update_from_headers(&headers);

        let response = tokio::time::timeout(Duration::from_secs(2), adapter.service_messages(None, None))
            .await
            .expect("rate-limited call must not reach the network")
            .unwrap();

        assert_eq!(response.metadata, Some(json!({ "cached": true })));
    }

    #[test]
    fn headsign_cache_evicts_oldest_entry_past_capacity() {
        let mut cache = HeadsignCache::new(2);
        cache.get_or_insert_with("t1", || "One".to_string());
        cache.get_or_insert_with("t2", || "Two".to_string());
        cache.get_or_insert_with("t3", || "Three".to_string());

        assert!(!cache.entries.contains_key("t1"));
        assert!(cache.entries.contains_key("t2"));
        assert!(cache.entries.contains_key("t3"));
    }

    #[test]
    fn headsign_cache_returns_cached_value_without_recomputing() {
        let mut cache = HeadsignCache::new(8);
        let value = cache.get_or_insert_with("t1", || "One".to_string());
        assert_eq!(value, "One");
        let value = cache.get_or_insert_with("t1", || "Other".to_string());
        assert_eq!(value, "One");
    }

    #[test]
    fn bkk_specific_fields_returns_none_when_no_extension_present() {
        // An entity/vehicle submessage whose vehicle descriptor (field 1 of
        // VehiclePosition, which nests id as field 1) carries only known
        // fields yields no extension payload.
        let vehicle_id_field = encode_string_field(1, "veh-1");
        let vehicle_descriptor = wrap_length_delimited(2, &vehicle_id_field);
        let vehicle_position = vehicle_descriptor; // only field 2 (vehicle descriptor) present
        let entity = wrap_length_delimited(4, &vehicle_position);
        let feed = wrap_length_delimited(2, &entity);

        assert!(BkkAdapter::bkk_specific_fields(&feed, "veh-1").is_none());
    }

    fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    fn encode_string_field(number: u32, value: &str) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(((number as u64) << 3) | 2, &mut out);
        encode_varint(value.len() as u64, &mut out);
        out.extend_from_slice(value.as_bytes());
        out
    }

    fn wrap_length_delimited(number: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(((number as u64) << 3) | 2, &mut out);
        encode_varint(payload.len() as u64, &mut out);
        out.extend_from_slice(payload);
        out
    }
}
