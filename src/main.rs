mod cache;
mod config;
mod error;
mod geo;
mod gtfs;
mod maintenance;
mod providers;
mod rate_limit;
mod registry;

#[cfg(test)]
mod test_utils;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use actix_web::{get, middleware::Logger, web, App, HttpResponse, HttpServer, Responder};
use serde_json::json;

use config::ProviderConfig;
use error::AppResult;
use gtfs::Feed;
use providers::{bkk::BkkAdapter, delijn::DelijnAdapter, stib::StibAdapter, ProviderAdapter, ProviderCommon};
use registry::Registry;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

#[get("/api/providers")]
async fn list_providers(registry: web::Data<Registry>) -> impl Responder {
    HttpResponse::Ok().json(registry.providers_summary())
}

#[get("/api/docs")]
async fn docs(registry: web::Data<Registry>) -> impl Responder {
    HttpResponse::Ok().json(registry.docs())
}

/// `GET/POST /api/{provider}/{endpoint}[/{p1}[/{p2}]]` (spec §6). Positional
/// params beyond `provider`/`endpoint` are passed through to the adapter as
/// strings; each endpoint interprets its own arity (spec §4.10 point 2).
#[actix_web::route("/api/{provider}/{endpoint}", method = "GET", method = "POST")]
async fn dispatch_root(path: web::Path<(String, String)>, query: web::Query<HashMap<String, String>>, registry: web::Data<Registry>) -> AppResult<impl Responder> {
    let (provider, endpoint) = path.into_inner();
    let result = registry.dispatch(&provider, &endpoint, &[], &query).await?;
    Ok(web::Json(result))
}

#[actix_web::route("/api/{provider}/{endpoint}/{p1}", method = "GET", method = "POST")]
async fn dispatch_one(path: web::Path<(String, String, String)>, query: web::Query<HashMap<String, String>>, registry: web::Data<Registry>) -> AppResult<impl Responder> {
    let (provider, endpoint, p1) = path.into_inner();
    let result = registry.dispatch(&provider, &endpoint, &[p1], &query).await?;
    Ok(web::Json(result))
}

#[actix_web::route("/api/{provider}/{endpoint}/{p1}/{p2}", method = "GET", method = "POST")]
async fn dispatch_two(
    path: web::Path<(String, String, String, String)>,
    query: web::Query<HashMap<String, String>>,
    registry: web::Data<Registry>,
) -> AppResult<impl Responder> {
    let (provider, endpoint, p1, p2) = path.into_inner();
    let result = registry.dispatch(&provider, &endpoint, &[p1, p2], &query).await?;
    Ok(web::Json(result))
}

/// Builds one adapter (and its feed's refresh loop) for `name`, per spec
/// §4.10 "discover adapter packages, instantiate each enabled one".
fn build_adapter(name: &str, cache_root: &std::path::Path) -> (Box<dyn ProviderAdapter>, ProviderConfig, cache::CacheStore, reqwest::Client, Arc<Feed>) {
    let provider_config = config::load_provider_config(name);
    let feed = Arc::new(Feed::new());
    let cache_store = cache::CacheStore::new(cache_root.join(name));
    let http = reqwest::Client::new();

    let common = ProviderCommon::new(provider_config.clone(), cache_root.join(name), feed.clone());
    let adapter: Box<dyn ProviderAdapter> = match name {
        "stib" => Box::new(StibAdapter::new(common)),
        "delijn" => Box::new(DelijnAdapter::new(common)),
        "bkk" => Box::new(BkkAdapter::new(common)),
        other => panic!("unknown built-in provider {other:?}; add an adapter or remove it from ENABLED_PROVIDERS"),
    };

    (adapter, provider_config, cache_store, http, feed)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::try_init().ok();

    log::debug!("Debug logging enabled");

    dotenvy::from_filename(".env").ok();

    let project_root = config::project_root().unwrap_or_else(|e| {
        log::error!("fatal configuration error: {e}");
        std::process::exit(1);
    });
    let cache_root = project_root.join("cache");

    let mut registry = Registry::new();
    let mut reload_tasks = Vec::new();

    for name in config::enabled_providers() {
        let (adapter, provider_config, cache_store, http, feed) = build_adapter(&name, &cache_root);
        reload_tasks.push(tokio::spawn(maintenance::keep_feed_fresh(provider_config, cache_store, http, feed)));
        registry.register(adapter);
    }

    let registry = web::Data::new(registry);

    let listen_address = env::var("LISTEN_ADDRESS").unwrap_or("127.0.0.1:8080".to_string());

    log::info!("Starting server at {}", listen_address);

    let server = HttpServer::new(move || {
        let logger = Logger::default();

        let mut cors = actix_cors::Cors::default().allowed_methods(vec!["GET", "POST"]).allowed_headers(vec!["accept", "content-type"]);

        if let Ok(allowed_origin) = env::var("ALLOW_ORIGIN") {
            if allowed_origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(&allowed_origin);
            }
        }

        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(registry.clone())
            .service(health)
            .service(list_providers)
            .service(docs)
            .service(dispatch_root)
            .service(dispatch_one)
            .service(dispatch_two)
    })
    .bind(listen_address)?
    .run();

    let result = server.await;
    log::info!("Server stopped");

    for task in reload_tasks {
        task.abort();
    }

    result
}
