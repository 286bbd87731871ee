//! Top-level error taxonomy (spec §7): every module's `thiserror` enum is
//! composed into `AppError` via `#[from]`, which implements
//! `actix_web::ResponseError` and maps the taxonomy onto the status table in
//! SPEC_FULL.md §7.

use actix_web::{HttpResponse, ResponseError};
use reqwest::StatusCode;
use serde_json::json;

use crate::cache::CacheError;
use crate::geo::GeoError;
use crate::gtfs::loader::GtfsLoadError;
use crate::gtfs::reader::GtfsError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("geo error: {0}")]
    Geo(#[from] GeoError),

    #[error("gtfs parse error: {0}")]
    GtfsParse(#[from] GtfsError),

    #[error("malformed feed: {0}")]
    MalformedFeed(#[from] GtfsLoadError),

    #[error(transparent)]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned an unexpected shape: {0}")]
    UpstreamSchema(String),

    #[error("unknown provider {provider:?}; available: {available:?}")]
    UnknownProvider {
        provider: String,
        available: Vec<String>,
    },

    #[error("unknown endpoint {endpoint:?} on provider {provider:?}; available: {available:?}")]
    UnknownEndpoint {
        provider: String,
        endpoint: String,
        available: Vec<String>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("feed not yet loaded")]
    FeedNotReady,

    #[error("client disconnected")]
    ClientDisconnected,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Geo(_) => StatusCode::BAD_REQUEST,
            AppError::GtfsParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MalformedFeed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamSchema(_) => StatusCode::OK,
            AppError::UnknownProvider { .. } => StatusCode::NOT_FOUND,
            AppError::UnknownEndpoint { .. } => StatusCode::NOT_FOUND,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            AppError::FeedNotReady => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ClientDisconnected => StatusCode::from_u16(499).unwrap(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("{self}");

        let mut builder = HttpResponse::build(self.status_code());

        let body = match self {
            AppError::UnknownProvider { available, .. } => {
                json!({ "error": self.to_string(), "available_providers": available })
            }
            AppError::UnknownEndpoint { available, .. } => {
                json!({ "error": self.to_string(), "available_endpoints": available })
            }
            AppError::FeedNotReady => {
                builder.insert_header(("Retry-After", "5"));
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        builder.json(body)
    }
}

pub type AppResult<T> = Result<T, AppError>;
