//! De Lijn (Flanders) adapter, grounded in the original's
//! `transit_providers/be/delijn/api.py`. Two real-time shapes are at play
//! here: waiting times come from De Lijn's own per-stop JSON endpoints
//! (`parse_stop_info`/`parse_passing_times`), while vehicle positions come
//! from De Lijn's GTFS-Realtime feed requested in JSON mode
//! (`?json=true&position=true&delay=true`) — an absolute lat/lon/bearing per
//! vehicle, unlike STIB's next-stop-and-distance telemetry, so there is no
//! shape interpolation step here.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use crate::gtfs::feed::FeedSnapshot;
use crate::gtfs::structure::realtime_json::FeedMessage;
use crate::gtfs::translations::resolve_language;

use super::{
    minutes_label, normalize_color, ArrivalMetadata, Colors, Coordinates, Endpoint, LanguageMetadata,
    LineWaitingTimes, ProviderAdapter, ProviderCommon, RouteResponse, RouteVariantWire, ServiceMessageWire,
    ServiceMessagesResponse, StopMetadata, StopWaitingTimes, StopWire, VehiclePositionWire, VehiclesResponse,
    WaitingTimeEntry, WaitingTimesResponse,
};

const CAPABILITIES: &[Endpoint] = &[
    Endpoint::WaitingTimes,
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

pub struct DelijnAdapter {
    common: ProviderCommon,
}

impl DelijnAdapter {
    pub fn new(common: ProviderCommon) -> Self {
        Self { common }
    }

    fn requested_language<'a>(&'a self, language: Option<&'a str>) -> &'a str {
        language.unwrap_or_else(|| self.common.config.available_languages.first().map(|s| s.as_str()).unwrap_or("nl"))
    }

    fn timezone(&self) -> Tz {
        self.common.config.default_timezone.parse().unwrap_or(Tz::UTC)
    }

    fn api_key(&self) -> String {
        self.common.config.api_key.clone().unwrap_or_default()
    }
}

fn parse_local_datetime(tz: Tz, s: &str) -> Option<DateTime<Tz>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()?;
    tz.from_local_datetime(&naive).earliest()
}

fn minutes_until(tz: Tz, target: DateTime<Tz>) -> i64 {
    let now = Utc::now().with_timezone(&tz);
    ((target - now).num_seconds() as f64 / 60.0) as i64
}

/// Routes whose `route_short_name` equals `line` — De Lijn line numbers are
/// the only identifier the real-time vehicle feed gives us, so we resolve
/// back to GTFS `route_id`s to find the trips that belong to it.
fn route_ids_for_line(snapshot: &FeedSnapshot, line: &str) -> Vec<String> {
    snapshot.routes_by_id.values().filter(|r| r.short_name == line).map(|r| r.id.clone()).collect()
}

fn direction_label(direction_id: Option<u8>) -> &'static str {
    match direction_id {
        Some(1) => "TERUG",
        _ => "HEEN",
    }
}

#[async_trait]
impl ProviderAdapter for DelijnAdapter {
    fn name(&self) -> &str {
        "delijn"
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

    async fn waiting_times(&self, stop_id: Option<&str>, language: Option<&str>) -> AppResult<WaitingTimesResponse> {
        let memo_key = stop_id.unwrap_or("*");
        if let Some(cached) = self.common.waiting_times_memo.get(memo_key) {
            return Ok(cached);
        }

        let stop_ids: Vec<String> = match stop_id {
            Some(id) => vec![id.to_string()],
            None => self.common.config.stop_ids.clone(),
        };
        if stop_ids.is_empty() {
            return Ok(WaitingTimesResponse::default());
        }

        if !self.common.rate_limiter.can_make_request() {
            if let Some(mut stale) = self.common.waiting_times_memo.get_stale(memo_key) {
                log::warn!("delijn rate limit exhausted, serving stale waiting times for {memo_key:?}");
                super::mark_cached(&mut stale.metadata);
                return Ok(stale);
            }
            return Err(AppError::UpstreamSchema(
                "delijn rate limit exhausted and no cached waiting times available".to_string(),
            ));
        }

        let api_url = self
            .common
            .config
            .api_url
            .clone()
            .ok_or_else(|| AppError::Config("DELIJN_API_URL is not configured".to_string()))?;
        let snapshot = self.common.snapshot()?;
        let requested_language = self.requested_language(language).to_string();
        let tz = self.timezone();

        let mut stops_data: HashMap<String, StopWaitingTimes> = HashMap::new();
        for id in &stop_ids {
            self.common.before_upstream_call().await;
            let stop_response = self.common.http.get(format!("{api_url}/haltes/3/{id}")).header("Ocp-Apim-Subscription-Key", self.api_key()).send().await?;
            let stop_body: Value = stop_response.json().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

            self.common.before_upstream_call().await;
            let realtime_response =
                self.common.http.get(format!("{api_url}/haltes/3/{id}/real-time")).header("Ocp-Apim-Subscription-Key", self.api_key()).send().await?;
            let realtime_body: Value = realtime_response.json().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

            let name = stop_body["omschrijvingLang"].as_str().unwrap_or(id).to_string();
            let coordinates = stop_body["geoCoordinaat"]["latitude"]
                .as_f64()
                .zip(stop_body["geoCoordinaat"]["longitude"].as_f64())
                .map(|(lat, lon)| Coordinates { lat, lon })
                .or_else(|| ProviderCommon::gtfs_fallback_coordinates(&snapshot, id));

            let entry = stops_data.entry(id.clone()).or_insert_with(|| StopWaitingTimes {
                name,
                coordinates,
                translations: snapshot.translations.for_stop(id).cloned(),
                metadata: Some(StopMetadata { source: "api".to_string(), warning: None }),
                lines: HashMap::new(),
            });

            for halte in realtime_body["halteDoorkomsten"].as_array().into_iter().flatten() {
                for doorkomst in halte["doorkomsten"].as_array().into_iter().flatten() {
                    let Some(line) = doorkomst["lijnnummer"].as_i64().map(|n| n.to_string()).or_else(|| doorkomst["lijnnummer"].as_str().map(str::to_string)) else {
                        continue;
                    };
                    let Some(destination) = doorkomst["bestemming"].as_str() else { continue };
                    let Some(scheduled_raw) = doorkomst["dienstregelingTijdstip"].as_str() else { continue };
                    let Some(scheduled) = parse_local_datetime(tz, scheduled_raw) else { continue };

                    let realtime_raw = doorkomst["real-timeTijdstip"].as_str();
                    let is_realtime = realtime_raw.is_some();
                    let expected = realtime_raw.and_then(|s| parse_local_datetime(tz, s)).unwrap_or(scheduled);

                    let translations = HashMap::from([(requested_language.clone(), destination.to_string())]);
                    let resolved = resolve_language(Some(&translations), &requested_language, &self.common.config.available_languages, destination);

                    let line_entry = entry.lines.entry(line.clone()).or_insert_with(LineWaitingTimes::default);
                    let headsign_entries = line_entry.by_headsign.entry(destination.to_string()).or_default();

                    headsign_entries.push(WaitingTimeEntry {
                        scheduled_time: Some(scheduled.format("%H:%M").to_string()),
                        scheduled_minutes: Some(minutes_label(minutes_until(tz, scheduled))),
                        realtime_time: is_realtime.then(|| expected.format("%H:%M").to_string()),
                        realtime_minutes: is_realtime.then(|| minutes_label(minutes_until(tz, expected))),
                        delay: is_realtime.then(|| (expected - scheduled).num_seconds()),
                        is_realtime,
                        provider: "delijn".to_string(),
                        message: None,
                        metadata: ArrivalMetadata { language: LanguageMetadata::from(resolved), cached: false },
                    });
                }
            }
        }

        let result = WaitingTimesResponse { stops_data, metadata: None };
        self.common.waiting_times_memo.set(memo_key, result.clone());
        Ok(result)
    }

    async fn vehicles(&self, line: Option<&str>, direction: Option<&str>) -> AppResult<VehiclesResponse> {
        let memo_key = format!("{}:{}", line.unwrap_or("*"), direction.unwrap_or("*"));
        if let Some(cached) = self.common.vehicles_memo.get(&memo_key) {
            return Ok(cached);
        }
        let Some(line) = line else {
            return Ok(VehiclesResponse { vehicles: Vec::new(), metadata: None });
        };
        if !self.common.rate_limiter.can_make_request() {
            if let Some(mut stale) = self.common.vehicles_memo.get_stale(&memo_key) {
                log::warn!("delijn rate limit exhausted, serving stale vehicle positions");
                super::mark_cached(&mut stale.metadata);
                return Ok(stale);
            }
            return Ok(VehiclesResponse { vehicles: Vec::new(), metadata: None });
        }

        let snapshot = self.common.snapshot()?;
        let route_ids = route_ids_for_line(&snapshot, line);
        if route_ids.is_empty() {
            return Err(AppError::NotFound(format!("unknown line {line:?}")));
        }

        let mut trip_directions: HashMap<String, Option<u8>> = HashMap::new();
        for route_id in &route_ids {
            for trip_id in snapshot.trips_by_route.get(route_id).into_iter().flatten() {
                if let Some(trip) = snapshot.trips_by_id.get(trip_id) {
                    trip_directions.insert(trip_id.clone(), trip.direction_id);
                }
            }
        }

        let realtime_url =
            self.common.config.gtfs_realtime_url.clone().unwrap_or_else(|| "https://api.delijn.be/gtfs/v3/realtime".to_string());

        self.common.before_upstream_call().await;
        let response = self
            .common
            .http
            .get(&realtime_url)
            .header("Ocp-Apim-Subscription-Key", self.api_key())
            .query(&[("json", "true"), ("position", "true"), ("delay", "true")])
            .send()
            .await?;
        self.common.rate_limiter.update_from_headers(response.headers());
        let body = response.bytes().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;
        let feed: FeedMessage = serde_json::from_slice(&body).map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

        let mut vehicles = Vec::new();
        for entity in feed.entity {
            let Some(vehicle) = entity.vehicle else { continue };
            let Some(trip_id) = vehicle.trip.as_ref().and_then(|t| t.trip_id.clone()) else { continue };
            let Some(&direction_id) = trip_directions.get(&trip_id) else { continue };
            if let Some(wanted) = direction {
                if direction_label(direction_id) != wanted {
                    continue;
                }
            }

            let Some(position) = vehicle.position else { continue };
            let bearing = position.bearing.clone().and_then(|b| b.into_inner().ok()).map(f64::from);

            vehicles.push(VehiclePositionWire {
                line: line.to_string(),
                direction: direction_id,
                current_segment: (None, String::new()),
                distance_to_next: 0.0,
                segment_length: 0.0,
                is_valid: true,
                interpolated_position: Some((position.latitude as f64, position.longitude as f64)),
                bearing,
                shape_segment: None,
                raw_data: Some(json!({
                    "vehicle_id": vehicle.vehicle.as_ref().and_then(|v| v.id.clone()),
                    "trip_id": trip_id,
                    "direction": direction_label(direction_id),
                })),
            });
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

        let api_url = self
            .common
            .config
            .api_url
            .clone()
            .ok_or_else(|| AppError::Config("DELIJN_API_URL is not configured".to_string()))?;
        let lines: Vec<String> = monitored_lines.map(|l| l.to_vec()).unwrap_or_else(|| self.common.config.monitored_lines.clone());

        let mut raw_messages = Vec::new();
        for line in &lines {
            for dir in ["HEEN", "TERUG"] {
                for endpoint in ["storingen", "omleidingen"] {
                    self.common.before_upstream_call().await;
                    let response = self
                        .common
                        .http
                        .get(format!("{api_url}/lijnen/3/{line}/lijnrichtingen/{dir}/{endpoint}"))
                        .header("Ocp-Apim-Subscription-Key", self.api_key())
                        .send()
                        .await?;
                    self.common.rate_limiter.update_from_headers(response.headers());
                    let Ok(body) = response.json::<Value>().await else { continue };
                    for item in body["omleidingen"].as_array().into_iter().flatten() {
                        raw_messages.push(item.clone());
                    }
                }
            }
        }

        let snapshot = self.common.snapshot()?;
        let mut seen = Vec::new();
        let mut messages = Vec::new();
        for msg in &raw_messages {
            let title = msg["titel"].as_str().unwrap_or_default();
            let description = msg["omschrijving"].as_str().unwrap_or_default();
            let key = (title.to_string(), description.to_string());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);

            let affected_lines: Vec<String> =
                msg["lijnrichtingen"].as_array().into_iter().flatten().filter_map(|lr| lr["lijnnummer"].as_i64().map(|n| n.to_string())).collect();
            let affected_stop_ids: Vec<String> =
                msg["haltes"].as_array().into_iter().flatten().filter_map(|h| h["haltenummer"].as_i64().map(|n| n.to_string())).collect();
            let stop_names: Vec<String> = affected_stop_ids
                .iter()
                .map(|id| ProviderCommon::gtfs_stop_name(&snapshot, id).unwrap_or_else(|| id.clone()))
                .collect();

            let is_monitored =
                affected_lines.iter().any(|l| lines.contains(l)) || monitored_stops.map(|stops| stops.iter().any(|s| affected_stop_ids.contains(s))).unwrap_or(false);

            messages.push(ServiceMessageWire {
                text: if description.is_empty() { title.to_string() } else { description.to_string() },
                metadata: ArrivalMetadata {
                    language: LanguageMetadata { selected: Some("nl".to_string()), requested: "nl".to_string(), fallback_chain: vec![], warning: None },
                    cached: false,
                },
                lines: affected_lines,
                points: affected_stop_ids,
                stops: stop_names,
                priority: 0,
                kind: msg["type"].as_str().unwrap_or_default().to_string(),
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
        let api_url = self
            .common
            .config
            .api_url
            .clone()
            .ok_or_else(|| AppError::Config("DELIJN_API_URL is not configured".to_string()))?;

        self.common.before_upstream_call().await;
        let palette_response = self.common.http.get(format!("{api_url}/kleuren")).header("Ocp-Apim-Subscription-Key", self.api_key()).send().await?;
        let palette: Value = palette_response.json().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;
        let palette_map: HashMap<String, String> = palette["kleuren"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|c| c["code"].as_str().zip(c["hex"].as_str()).map(|(code, hex)| (code.to_string(), format!("#{hex}"))))
            .collect();

        self.common.before_upstream_call().await;
        let line_response =
            self.common.http.get(format!("{api_url}/lijnen/3/{line}/lijnkleuren")).header("Ocp-Apim-Subscription-Key", self.api_key()).send().await?;
        let line_colors: Value = line_response.json().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

        let lookup = |field: &str| -> String {
            line_colors[field]["code"]
                .as_str()
                .and_then(|code| palette_map.get(code))
                .map(|hex| normalize_color(hex, "#000000"))
                .unwrap_or_else(|| "#000000".to_string())
        };

        Ok(Colors {
            background: lookup("achtergrond"),
            background_border: lookup("achtergrondRand"),
            text: lookup("voorgrond"),
            text_border: lookup("voorgrondRand"),
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
            name: "delijn".to_string(),
            api_url: Some("https://example.invalid".to_string()),
            api_key: None,
            gtfs_url: None,
            gtfs_realtime_url: Some("https://example.invalid/realtime".to_string()),
            monitored_lines: vec!["1".to_string()],
            stop_ids: vec!["200455".to_string()],
            rate_limit_delay: Duration::from_secs(10),
            gtfs_cache_ttl: Duration::from_secs(3600),
            available_languages: vec!["nl".to_string()],
            default_timezone: "Europe/Brussels".to_string(),
        }
    }

    #[test]
    fn route_ids_for_line_matches_short_name_not_id() {
        let snapshot = crate::test_utils::fixture_snapshot();
        assert_eq!(route_ids_for_line(&snapshot, "1"), vec!["1".to_string()]);
        assert!(route_ids_for_line(&snapshot, "nonexistent").is_empty());
    }

    #[test]
    fn direction_label_distinguishes_outbound_and_return() {
        assert_eq!(direction_label(Some(0)), "HEEN");
        assert_eq!(direction_label(Some(1)), "TERUG");
        assert_eq!(direction_label(None), "HEEN");
    }

    /// Mirrors the STIB rate-limited fallback test: once the quota is known
    /// exhausted, `vehicles()` returns the memoized value annotated
    /// `_metadata.cached=true` without ever reaching the network.
    #[tokio::test]
    async fn vehicles_serves_stale_memo_with_cached_marker_when_rate_limited() {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

        let cache_dir = tempfile::tempdir().unwrap();
        let feed = crate::test_utils::fixture_feed();
        let common = ProviderCommon::new(config(), cache_dir.path(), feed);
        let adapter = DelijnAdapter::new(common);

        let previous = VehiclesResponse { vehicles: Vec::new(), metadata: None };
        adapter.common.vehicles_memo.set_stale("1:*", previous);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from_static("0"));
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), HeaderValue::from_static("60"));
        adapter.common.rate_limiter.update_from_headers(&headers);

        let response = tokio::time::timeout(Duration::from_secs(2), adapter.vehicles(Some("1"), None))
            .await
            .expect("rate-limited call must not reach the network")
            .unwrap();

        assert_eq!(response.metadata, Some(json!({ "cached": true })));
    }
}
