//! STIB/MIVB (Brussels) adapter: JSON waiting-times and service-message APIs
//! over the shared GTFS bundle, grounded in the original's
//! `transit_providers/be/stib/api.py` (`get_waiting_times`,
//! `get_vehicle_positions`, `get_service_messages`).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use crate::gtfs::feed::FeedSnapshot;
use crate::gtfs::translations::resolve_language;
use crate::gtfs::vehicle::{self, DirectionKey, VehicleTelemetry};

use super::{
    normalize_color, ArrivalMetadata, Colors, Coordinates, Endpoint, LanguageMetadata, LineWaitingTimes,
    ProviderAdapter, ProviderCommon, RouteResponse, RouteVariantWire, ServiceMessageWire, ServiceMessagesResponse,
    StopMetadata, StopWaitingTimes, StopWire, VehiclePositionWire, VehiclesResponse, WaitingTimeEntry,
    WaitingTimesResponse,
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

pub struct StibAdapter {
    common: ProviderCommon,
}

impl StibAdapter {
    pub fn new(common: ProviderCommon) -> Self {
        Self { common }
    }

    fn requested_language<'a>(&'a self, language: Option<&'a str>) -> &'a str {
        language.unwrap_or_else(|| self.common.config.available_languages.first().map(|s| s.as_str()).unwrap_or("en"))
    }
}

#[async_trait]
impl ProviderAdapter for StibAdapter {
    fn name(&self) -> &str {
        "stib"
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

        if !self.common.rate_limiter.can_make_request() {
            if let Some(mut stale) = self.common.waiting_times_memo.get_stale(memo_key) {
                log::warn!("stib rate limit exhausted, serving stale waiting times for {memo_key:?}");
                super::mark_cached(&mut stale.metadata);
                return Ok(stale);
            }
            return Err(AppError::UpstreamSchema(
                "stib rate limit exhausted and no cached waiting times available".to_string(),
            ));
        }

        let api_url = self
            .common
            .config
            .api_url
            .clone()
            .ok_or_else(|| AppError::Config("STIB_API_URL is not configured".to_string()))?;
        let api_key = self.common.config.api_key.clone().unwrap_or_default();

        let mut query = vec![
            ("apikey".to_string(), api_key),
            ("limit".to_string(), "100".to_string()),
            ("select".to_string(), "pointid,lineid,passingtimes".to_string()),
        ];
        if let Some(id) = stop_id {
            query.push(("where".to_string(), format!("pointid=\"{}\"", vehicle::strip_suffix(id))));
        }

        self.common.before_upstream_call().await;
        let response = self.common.http.get(&api_url).query(&query).send().await?;
        self.common.rate_limiter.update_from_headers(response.headers());
        let body: Value = response.json().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

        let snapshot = self.common.snapshot()?;
        let requested_language = self.requested_language(language).to_string();
        let parsed = parse_waiting_times(&body, &snapshot, &self.common.config, &requested_language);

        self.common.waiting_times_memo.set(memo_key, parsed.clone());
        Ok(parsed)
    }

    async fn vehicles(&self, line: Option<&str>, direction: Option<&str>) -> AppResult<VehiclesResponse> {
        let memo_key = format!("{}:{}", line.unwrap_or("*"), direction.unwrap_or("*"));
        if let Some(cached) = self.common.vehicles_memo.get(&memo_key) {
            return Ok(cached);
        }
        if !self.common.rate_limiter.can_make_request() {
            if let Some(mut stale) = self.common.vehicles_memo.get_stale(&memo_key) {
                log::warn!("stib rate limit exhausted, serving stale vehicle positions");
                super::mark_cached(&mut stale.metadata);
                return Ok(stale);
            }
            return Ok(VehiclesResponse { vehicles: Vec::new(), metadata: None });
        }

        let base_url = "https://data.stib-mivb.brussels/api/explore/v2.1/catalog/datasets/vehicle-position-rt-production/records";
        let api_key = self.common.config.api_key.clone().unwrap_or_default();
        let query = vec![("apikey".to_string(), api_key), ("limit".to_string(), "100".to_string())];

        self.common.before_upstream_call().await;
        let response = self.common.http.get(base_url).query(&query).send().await?;
        self.common.rate_limiter.update_from_headers(response.headers());
        let body: Value = response.json().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

        let snapshot = self.common.snapshot()?;
        let mut vehicles = Vec::new();

        for record in body["results"].as_array().into_iter().flatten() {
            let line_id = record["lineid"].as_str().unwrap_or_default().to_string();
            if let Some(wanted) = line {
                if line_id != wanted {
                    continue;
                }
            }
            let Some(raw_positions) = record["vehiclepositions"].as_str() else {
                continue;
            };
            let Ok(positions) = serde_json::from_str::<Value>(raw_positions) else {
                continue;
            };

            for position in positions.as_array().into_iter().flatten() {
                let vehicle_direction = position["directionId"].as_str().map(|s| s.to_string());
                if let (Some(wanted), Some(actual)) = (direction, &vehicle_direction) {
                    if wanted != actual {
                        continue;
                    }
                }
                let Some(next_stop) = position["pointId"].as_str() else {
                    continue;
                };
                let Some(distance) = position["distanceFromPoint"].as_f64() else {
                    continue;
                };

                let telemetry = VehicleTelemetry {
                    provider: "stib".to_string(),
                    line_id: line_id.clone(),
                    direction: vehicle_direction
                        .as_deref()
                        .and_then(|d| d.parse::<u8>().ok())
                        .map(DirectionKey::Id)
                        .unwrap_or_else(|| DirectionKey::TerminusStopId(next_stop.to_string())),
                    next_stop_id: next_stop.to_string(),
                    distance_to_next_stop_m: distance,
                    delay_seconds: None,
                };

                let position = vehicle::reconstruct(&snapshot, &telemetry);
                vehicles.push(VehiclePositionWire::from(position));
            }
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

        let messages_url = self
            .common
            .config
            .api_url
            .clone()
            .ok_or_else(|| AppError::Config("STIB_API_URL is not configured".to_string()))?;
        let api_key = self.common.config.api_key.clone().unwrap_or_default();

        self.common.before_upstream_call().await;
        let response = self
            .common
            .http
            .get(&messages_url)
            .query(&[
                ("apikey", api_key.as_str()),
                ("limit", "100"),
                ("select", "content,lines,points,priority,type"),
            ])
            .send()
            .await?;
        self.common.rate_limiter.update_from_headers(response.headers());
        let body: Value = response.json().await.map_err(|e| AppError::UpstreamSchema(e.to_string()))?;

        let snapshot = self.common.snapshot()?;
        let requested_language = self.requested_language(None).to_string();
        let messages = parse_service_messages(&body, &snapshot, &self.common.config, &requested_language, monitored_lines, monitored_stops);

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

/// Destinations arrive either as a plain string or as a `{lang: text}` map
/// (spec §9 / original `destination_data`). Normalizes both into the map
/// `resolve_language` expects.
fn destination_translations(value: &Value) -> HashMap<String, String> {
    match value {
        Value::Object(map) => map.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect(),
        Value::String(s) => HashMap::from([("fr".to_string(), s.clone())]),
        _ => HashMap::new(),
    }
}

fn parse_waiting_times(body: &Value, snapshot: &FeedSnapshot, config: &ProviderConfig, requested_language: &str) -> WaitingTimesResponse {
    let mut stops_data: HashMap<String, StopWaitingTimes> = HashMap::new();
    let now = Utc::now();

    for record in body["results"].as_array().into_iter().flatten() {
        let Some(stop_id) = record["pointid"].as_str() else { continue };
        let Some(line) = record["lineid"].as_str() else { continue };

        let entry = stops_data.entry(stop_id.to_string()).or_insert_with(|| {
            let gtfs_stop = snapshot.stops_by_id.get(vehicle::strip_suffix(stop_id)).or_else(|| snapshot.stops_by_id.get(stop_id));
            let coordinates = gtfs_stop.and_then(|s| s.coordinates).map(Coordinates::from);
            StopWaitingTimes {
                name: gtfs_stop.map(|s| s.name.clone()).unwrap_or_else(|| stop_id.to_string()),
                coordinates,
                translations: gtfs_stop.and_then(|s| snapshot.translations.for_stop(&s.id)).cloned(),
                metadata: Some(StopMetadata {
                    source: if coordinates.is_some() { "gtfs".to_string() } else { "api".to_string() },
                    warning: None,
                }),
                lines: HashMap::new(),
            }
        });

        let Some(raw_passing_times) = record["passingtimes"].as_array().cloned().or_else(|| {
            record["passingtimes"].as_str().and_then(|s| serde_json::from_str::<Value>(s).ok()).and_then(|v| v.as_array().cloned())
        }) else {
            continue;
        };

        let line_entry = entry.lines.entry(line.to_string()).or_insert_with(LineWaitingTimes::default);

        for passing_time in &raw_passing_times {
            let destination_data = destination_translations(&passing_time["destination"]);
            let resolved = resolve_language(Some(&destination_data), requested_language, &config.available_languages, stop_id);

            let Some(expected) = passing_time["expectedArrivalTime"].as_str() else { continue };
            let Ok(arrival) = chrono::DateTime::parse_from_rfc3339(expected) else { continue };
            let minutes = ((arrival.with_timezone(&Utc) - now).num_seconds() / 60).max(0);

            let headsign = resolved.value.clone();
            let destination_entries = line_entry.by_headsign.entry(headsign).or_default();
            destination_entries.push(WaitingTimeEntry {
                scheduled_time: None,
                scheduled_minutes: None,
                realtime_time: Some(arrival.format("%H:%M").to_string()),
                realtime_minutes: Some(super::minutes_label(minutes)),
                delay: None,
                is_realtime: true,
                provider: "stib".to_string(),
                message: passing_time["message"].as_str().filter(|s| !s.is_empty()).map(|s| s.to_string()),
                metadata: ArrivalMetadata { language: LanguageMetadata::from(resolved), cached: false },
            });
        }
    }

    WaitingTimesResponse { stops_data, metadata: None }
}

fn parse_service_messages(
    body: &Value,
    snapshot: &FeedSnapshot,
    config: &ProviderConfig,
    requested_language: &str,
    monitored_lines: Option<&[String]>,
    monitored_stops: Option<&[String]>,
) -> Vec<ServiceMessageWire> {
    let mut out = Vec::new();

    for record in body["results"].as_array().into_iter().flatten() {
        let Some(content) = record["content"].as_str().and_then(|s| serde_json::from_str::<Value>(s).ok()) else {
            continue;
        };
        let Some(lines) = record["lines"].as_str().and_then(|s| serde_json::from_str::<Value>(s).ok()) else {
            continue;
        };
        let Some(points) = record["points"].as_str().and_then(|s| serde_json::from_str::<Value>(s).ok()) else {
            continue;
        };

        let affected_lines: Vec<String> = lines.as_array().into_iter().flatten().filter_map(|l| l["id"].as_str().map(|s| s.to_string())).collect();
        let affected_stop_ids: Vec<String> = points.as_array().into_iter().flatten().filter_map(|p| p["id"].as_str().map(|s| s.to_string())).collect();

        let is_monitored = monitored_lines.map(|lines| lines.iter().any(|l| affected_lines.contains(l))).unwrap_or(false)
            || monitored_stops.map(|stops| stops.iter().any(|s| affected_stop_ids.contains(s))).unwrap_or(false);

        let Some(text_with_langs) = content.get(0).and_then(|c| c["text"].get(0)) else {
            continue;
        };
        let translations = destination_translations(text_with_langs);
        let resolved = resolve_language(Some(&translations), requested_language, &config.available_languages, "");
        if resolved.value.is_empty() {
            continue;
        }

        let stop_names: Vec<String> = affected_stop_ids
            .iter()
            .map(|id| ProviderCommon::gtfs_stop_name(snapshot, id).unwrap_or_else(|| id.clone()))
            .collect();

        out.push(ServiceMessageWire {
            text: resolved.value.clone(),
            metadata: ArrivalMetadata { language: LanguageMetadata::from(resolved), cached: false },
            lines: affected_lines,
            points: affected_stop_ids,
            stops: stop_names,
            priority: record["priority"].as_i64().unwrap_or(0) as i32,
            kind: record["type"].as_str().unwrap_or_default().to_string(),
            is_monitored,
        });
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ProviderConfig;
    use serde_json::json;
    use std::time::Duration;

    fn config() -> ProviderConfig {
        ProviderConfig {
            name: "stib".to_string(),
            api_url: Some("https://example.invalid".to_string()),
            api_key: None,
            gtfs_url: None,
            gtfs_realtime_url: None,
            monitored_lines: vec!["1".to_string(), "5".to_string()],
            stop_ids: vec!["8122".to_string()],
            rate_limit_delay: Duration::from_secs(10),
            gtfs_cache_ttl: Duration::from_secs(3600),
            available_languages: vec!["fr".to_string(), "nl".to_string(), "en".to_string()],
            default_timezone: "Europe/Brussels".to_string(),
        }
    }

    /// Spec §8 scenario 1: upstream returns no coordinates for stop "8122";
    /// the response falls back to the GTFS-loaded position with `source: "gtfs"`.
    #[test]
    fn waiting_times_falls_back_to_gtfs_coordinates_when_upstream_has_none() {
        let mut snapshot = FeedSnapshot::default();
        snapshot.stops_by_id.insert(
            "8122".to_string(),
            crate::gtfs::feed::Stop {
                id: "8122".to_string(),
                name: "MONTGOMERY".to_string(),
                coordinates: Some((50.8466, 4.4022)),
                parent_station: None,
                location_type: Default::default(),
                platform_code: None,
                timezone: None,
            },
        );

        let body = json!({
            "results": [{
                "pointid": "8122",
                "lineid": "5",
                "passingtimes": [{
                    "destination": { "fr": "STOCKEL", "nl": "STOKKEL" },
                    "expectedArrivalTime": "2026-07-28T10:05:00+02:00",
                }],
            }]
        });

        let response = parse_waiting_times(&body, &snapshot, &config(), "fr");
        let stop = response.stops_data.get("8122").expect("stop present");
        let coords = stop.coordinates.expect("fallback coordinates");
        assert!((coords.lat - 50.8466).abs() < 1e-6);
        assert!((coords.lon - 4.4022).abs() < 1e-6);
        assert_eq!(stop.metadata.as_ref().unwrap().source, "gtfs");
    }

    /// Spec §8 scenario 4: a message affecting line "1" and stop "8122" is
    /// monitored when either is in the caller's monitored set, and not when
    /// neither is.
    #[test]
    fn service_message_monitoring_matches_lines_or_stops() {
        let snapshot = FeedSnapshot::default();
        let body = json!({
            "results": [{
                "content": [{ "text": [{ "fr": "Travaux en cours", "nl": "Werken aan de gang" }] }],
                "lines": [{ "id": "1" }],
                "points": [{ "id": "8122" }],
                "priority": 1,
                "type": "incident",
            }]
        });

        let monitored = parse_service_messages(&body, &snapshot, &config(), "fr", Some(&["1".to_string(), "5".to_string()]), Some(&["8122".to_string()]));
        assert_eq!(monitored.len(), 1);
        assert!(monitored[0].is_monitored);
        assert_eq!(monitored[0].text, "Travaux en cours");

        let unmonitored = parse_service_messages(&body, &snapshot, &config(), "fr", Some(&["92".to_string()]), Some(&[]));
        assert_eq!(unmonitored.len(), 1);
        assert!(!unmonitored[0].is_monitored);
    }

    /// Spec §8 scenario 6 / "Rate-limited adapter" property: once the quota
    /// is known exhausted, `vehicles()` returns the previous memoized value
    /// annotated `_metadata.cached=true` and never reaches the network (the
    /// API URL here is deliberately unreachable; reaching it would time the
    /// test out rather than silently pass).
    #[tokio::test]
    async fn vehicles_serves_stale_memo_with_cached_marker_when_rate_limited() {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

        let cache_dir = tempfile::tempdir().unwrap();
        let feed = crate::test_utils::fixture_feed();
        let common = ProviderCommon::new(config(), cache_dir.path(), feed);
        let adapter = StibAdapter::new(common);

        let previous = VehiclesResponse { vehicles: Vec::new(), metadata: None };
        adapter.common.vehicles_memo.set_stale("*:*", previous);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from_static("0"));
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), HeaderValue::from_static("60"));
        adapter.common.rate_limiter.update_from_headers(&headers);

        let response = tokio::time::timeout(Duration::from_secs(2), adapter.vehicles(None, None))
            .await
            .expect("rate-limited call must not reach the network")
            .unwrap();

        assert_eq!(response.metadata, Some(json!({ "cached": true })));
    }
}
