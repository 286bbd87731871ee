//! Provider Registry & Endpoint Dispatcher (C10, spec §4.10). Discovers and
//! holds the enabled [`ProviderAdapter`]s, exposes a uniform
//! `(provider, endpoint, positional params, query)` invocation, and
//! introspects `capabilities()` to publish `/api/docs` (spec §9 "global
//! mutable caches" redesign flag: the registry owns the adapters, handlers
//! retrieve them by name rather than reaching into module-level state).

use std::collections::HashMap;

use chrono::{NaiveDate, Timelike, Utc};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::providers::{Endpoint, ProviderAdapter};

pub struct Registry {
    adapters: HashMap<String, Box<dyn ProviderAdapter>>,
}

impl Registry {
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    pub fn register(&mut self, adapter: Box<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    fn available_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    fn adapter(&self, provider: &str) -> AppResult<&dyn ProviderAdapter> {
        self.adapters
            .get(provider)
            .map(|a| a.as_ref())
            .ok_or_else(|| AppError::UnknownProvider { provider: provider.to_string(), available: self.available_providers() })
    }

    /// `GET /api/providers` (spec §6): `{ provider_name -> { endpoints: [..] } }`.
    pub fn providers_summary(&self) -> Value {
        let mut out = serde_json::Map::new();
        let mut names = self.available_providers();
        names.sort();
        for name in names.drain(..) {
            let adapter = &self.adapters[&name];
            let endpoints: Vec<&str> = adapter.capabilities().iter().map(|e| e.name()).collect();
            out.insert(name, json!({ "endpoints": endpoints }));
        }
        Value::Object(out)
    }

    /// `GET /api/docs` (spec §4.10 point 3): method/param sketch per endpoint,
    /// no sample invocation — a live sample would mean every doc request
    /// fans out real upstream calls, which the rate limiter (C2) exists to
    /// prevent.
    pub fn docs(&self) -> Value {
        let mut providers = serde_json::Map::new();
        for name in self.available_providers() {
            let adapter = &self.adapters[&name];
            let endpoints: Vec<Value> = adapter.capabilities().iter().map(|e| endpoint_doc(*e)).collect();
            providers.insert(
                name.clone(),
                json!({
                    "monitored_lines": adapter.config().monitored_lines,
                    "stop_ids": adapter.config().stop_ids,
                    "endpoints": endpoints,
                }),
            );
        }
        json!({ "providers": providers })
    }

    /// Uniform endpoint invocation: `params` are the path segments after
    /// `{provider}/{endpoint}` (`p1`, `p2` in spec §6), `query` is the
    /// request's query string, parsed as a flat string map.
    pub async fn dispatch(&self, provider: &str, endpoint: &str, params: &[String], query: &HashMap<String, String>) -> AppResult<Value> {
        let adapter = self.adapter(provider)?;
        let resolved = resolve_endpoint(provider, adapter.capabilities(), endpoint)?;

        match resolved {
            Endpoint::WaitingTimes => {
                let stop_id = params.first().map(|s| s.as_str());
                let language = query.get("language").map(|s| s.as_str());
                let result = adapter.waiting_times(stop_id, language).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::Vehicles => {
                let line = params.first().map(|s| s.as_str());
                let direction = params.get(1).map(|s| s.as_str());
                let result = adapter.vehicles(line, direction).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::ServiceMessages => {
                let lines = query.get("lines").map(|v| split_csv(v));
                let stops = query.get("stops").map(|v| split_csv(v));
                let result = adapter.service_messages(lines.as_deref(), stops.as_deref()).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::Route => {
                let line = params.first().ok_or_else(|| AppError::InvalidParameter("route requires a line id".to_string()))?;
                let result = adapter.route(line).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::Colors => {
                let line = params.first().ok_or_else(|| AppError::InvalidParameter("colors requires a line id".to_string()))?;
                let result = adapter.colors(line).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::NearestStop => {
                let lat: f64 = parse_required_query(query, "lat")?;
                let lon: f64 = parse_required_query(query, "lon")?;
                let limit = parse_optional_query(query, "limit")?.unwrap_or(5);
                let max_distance_km = parse_optional_query(query, "max_distance_km")?.unwrap_or(2.0);
                let result = adapter.nearest_stop(lat, lon, limit, max_distance_km).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::StopByName => {
                let query_str = params.first().ok_or_else(|| AppError::InvalidParameter("stop_by_name requires a query".to_string()))?;
                let limit = parse_optional_query(query, "limit")?.unwrap_or(10);
                let result = adapter.stop_by_name(query_str, limit).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::TripsBetween => {
                let start_id = params.first().ok_or_else(|| AppError::InvalidParameter("trips_between requires a start stop id".to_string()))?;
                let end_id = params.get(1).ok_or_else(|| AppError::InvalidParameter("trips_between requires an end stop id".to_string()))?;
                let date: Option<NaiveDate> = parse_optional_query(query, "date")?;
                let result = adapter.find_trips_between(start_id, end_id, date).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::StationsInBbox => {
                let min_lat: f64 = parse_required_query(query, "min_lat")?;
                let min_lon: f64 = parse_required_query(query, "min_lon")?;
                let max_lat: f64 = parse_required_query(query, "max_lat")?;
                let max_lon: f64 = parse_required_query(query, "max_lon")?;
                let count_only: bool = parse_optional_query(query, "count_only")?.unwrap_or(false);
                let result = adapter.stations_in_bbox(min_lat, min_lon, max_lat, max_lon, count_only).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::DestinationsFrom => {
                let stop_id = params.first().ok_or_else(|| AppError::InvalidParameter("destinations_from requires a stop id".to_string()))?;
                let result = adapter.destinations_from(stop_id).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::OriginsTo => {
                let stop_id = params.first().ok_or_else(|| AppError::InvalidParameter("origins_to requires a stop id".to_string()))?;
                let result = adapter.origins_to(stop_id).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::RoutesServing => {
                let stop_id = params.first().ok_or_else(|| AppError::InvalidParameter("routes_serving requires a stop id".to_string()))?;
                let result = adapter.routes_serving(stop_id).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
            Endpoint::ScheduleWaitingTimes => {
                let stop_id = params.first().ok_or_else(|| AppError::InvalidParameter("schedule_waiting_times requires a stop id".to_string()))?;
                let route_id = query.get("route_id").map(|s| s.as_str());
                let limit = parse_optional_query(query, "limit")?.unwrap_or(10);
                // `date`/`seconds` default to the current UTC wall clock per
                // spec §9's "agency timezone absence" open question: prefer
                // UTC over host-local time when no better reference exists.
                let now = Utc::now();
                let at_date = parse_optional_query(query, "date")?.unwrap_or_else(|| now.date_naive());
                let at_seconds_since_midnight: u32 = parse_optional_query(query, "seconds")?.unwrap_or_else(|| now.time().num_seconds_from_midnight());
                let result = adapter.schedule_waiting_times(stop_id, at_date, at_seconds_since_midnight, route_id, limit).await?;
                Ok(serde_json::to_value(result).map_err(|e| AppError::UpstreamSchema(e.to_string()))?)
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_required_query<T: std::str::FromStr>(query: &HashMap<String, String>, key: &str) -> AppResult<T> {
    query
        .get(key)
        .ok_or_else(|| AppError::InvalidParameter(format!("missing required query parameter {key:?}")))?
        .parse()
        .map_err(|_| AppError::InvalidParameter(format!("{key:?} is not a valid number")))
}

fn parse_optional_query<T: std::str::FromStr>(query: &HashMap<String, String>, key: &str) -> AppResult<Option<T>> {
    match query.get(key) {
        Some(raw) => raw.parse().map(Some).map_err(|_| AppError::InvalidParameter(format!("{key:?} is not a valid number"))),
        None => Ok(None),
    }
}

fn resolve_endpoint(provider: &str, capabilities: &[Endpoint], endpoint: &str) -> AppResult<Endpoint> {
    capabilities.iter().copied().find(|e| e.name() == endpoint).ok_or_else(|| AppError::UnknownEndpoint {
        provider: provider.to_string(),
        endpoint: endpoint.to_string(),
        available: capabilities.iter().map(|e| e.name().to_string()).collect(),
    })
}

fn endpoint_doc(endpoint: Endpoint) -> Value {
    let (method, params, returns) = match endpoint {
        Endpoint::WaitingTimes => ("GET", vec!["stop_id?", "language? (query)"], "WaitingTimesResponse"),
        Endpoint::Vehicles => ("GET", vec!["line?", "direction?"], "VehiclesResponse"),
        Endpoint::ServiceMessages => ("GET", vec!["lines? (query, csv)", "stops? (query, csv)"], "ServiceMessagesResponse"),
        Endpoint::Route => ("GET", vec!["line"], "RouteResponse"),
        Endpoint::Colors => ("GET", vec!["line"], "Colors"),
        Endpoint::NearestStop => ("GET", vec!["lat (query)", "lon (query)", "limit? (query)", "max_distance_km? (query)"], "[Stop]"),
        Endpoint::StopByName => ("GET", vec!["query", "limit? (query)"], "[Stop]"),
        Endpoint::TripsBetween => ("GET", vec!["start_id", "end_id", "date? (query)"], "[TripSegment]"),
        Endpoint::StationsInBbox => {
            ("GET", vec!["min_lat (query)", "min_lon (query)", "max_lat (query)", "max_lon (query)", "count_only? (query)"], "StopsInBbox")
        }
        Endpoint::DestinationsFrom => ("GET", vec!["stop_id"], "[Stop]"),
        Endpoint::OriginsTo => ("GET", vec!["stop_id"], "[Stop]"),
        Endpoint::RoutesServing => ("GET", vec!["stop_id"], "[RouteServing]"),
        Endpoint::ScheduleWaitingTimes => {
            ("GET", vec!["stop_id", "date? (query)", "seconds? (query)", "route_id? (query)", "limit? (query)"], "[ScheduledArrival]")
        }
    };
    json!({ "name": endpoint.name(), "method": method, "params": params, "returns": returns })
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;

    use super::*;
    use crate::config::ProviderConfig;
    use crate::providers::{Colors, ProviderCommon};

    struct StubAdapter {
        common: ProviderCommon,
    }

    #[async_trait]
    impl ProviderAdapter for StubAdapter {
        fn name(&self) -> &str {
            "stub"
        }

        fn config(&self) -> &ProviderConfig {
            &self.common.config
        }

        fn capabilities(&self) -> &'static [Endpoint] {
            &[Endpoint::Colors]
        }

        fn common(&self) -> &ProviderCommon {
            &self.common
        }

        async fn colors(&self, _line: &str) -> AppResult<Colors> {
            Ok(Colors::default())
        }
    }

    fn stub_config() -> ProviderConfig {
        ProviderConfig {
            name: "stub".to_string(),
            api_url: None,
            api_key: None,
            gtfs_url: None,
            gtfs_realtime_url: None,
            monitored_lines: vec![],
            stop_ids: vec![],
            rate_limit_delay: std::time::Duration::from_secs(1),
            gtfs_cache_ttl: std::time::Duration::from_secs(1),
            available_languages: vec!["en".to_string()],
            default_timezone: "UTC".to_string(),
        }
    }

    fn registry_with_stub() -> Registry {
        let cache_dir = tempfile::tempdir().unwrap();
        let common = ProviderCommon::new(stub_config(), cache_dir.path(), std::sync::Arc::new(crate::gtfs::feed::Feed::new()));
        let mut registry = Registry::new();
        registry.register(Box::new(StubAdapter { common }));
        registry
    }

    #[tokio::test]
    async fn unknown_provider_lists_available_alternatives() {
        let registry = registry_with_stub();
        let err = registry.dispatch("nope", "colors", &[], &HashMap::new()).await.unwrap_err();
        match err {
            AppError::UnknownProvider { available, .. } => assert_eq!(available, vec!["stub".to_string()]),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_endpoint_on_known_provider_is_rejected() {
        let registry = registry_with_stub();
        let err = registry.dispatch("stub", "vehicles", &[], &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownEndpoint { .. }));
    }

    #[tokio::test]
    async fn dispatch_routes_to_the_adapter_method() {
        let registry = registry_with_stub();
        let params = vec!["1".to_string()];
        let result = registry.dispatch("stub", "colors", &params, &HashMap::new()).await.unwrap();
        assert_eq!(result["background"], "#000000");
    }

    #[test]
    fn providers_summary_lists_capabilities() {
        let registry = registry_with_stub();
        let summary = registry.providers_summary();
        assert_eq!(summary["stub"]["endpoints"], json!(["colors"]));
    }
}
