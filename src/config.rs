//! Explicit configuration: an environment-driven loader that assembles each
//! provider's `ProviderConfig` by layering built-in default -> compiled-in
//! per-provider default -> environment override, and fails fast on unknown
//! `<PROVIDER>_*` keys it doesn't recognize (spec §9 "dynamic config merging"
//! redesign flag; §6 lists the environment surface).

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// One adapter's configuration, assembled by [`load_provider_config`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub gtfs_url: Option<String>,
    pub gtfs_realtime_url: Option<String>,
    pub monitored_lines: Vec<String>,
    pub stop_ids: Vec<String>,
    pub rate_limit_delay: Duration,
    pub gtfs_cache_ttl: Duration,
    pub available_languages: Vec<String>,
    pub default_timezone: String,
}

/// Compiled-in defaults per provider, before environment overrides apply.
struct ProviderDefaults {
    rate_limit_delay_s: u64,
    gtfs_cache_ttl_s: u64,
    available_languages: &'static [&'static str],
    default_timezone: &'static str,
}

fn defaults_for(provider: &str) -> ProviderDefaults {
    match provider {
        "stib" => ProviderDefaults {
            rate_limit_delay_s: 10,
            gtfs_cache_ttl_s: 24 * 3600,
            available_languages: &["fr", "nl", "en"],
            default_timezone: "Europe/Brussels",
        },
        "delijn" => ProviderDefaults {
            rate_limit_delay_s: 15,
            gtfs_cache_ttl_s: 24 * 3600,
            available_languages: &["nl", "fr", "en"],
            default_timezone: "Europe/Brussels",
        },
        "bkk" => ProviderDefaults {
            rate_limit_delay_s: 5,
            gtfs_cache_ttl_s: 24 * 3600,
            available_languages: &["hu", "en"],
            default_timezone: "Europe/Budapest",
        },
        _ => ProviderDefaults {
            rate_limit_delay_s: 10,
            gtfs_cache_ttl_s: 24 * 3600,
            available_languages: &["en"],
            default_timezone: "UTC",
        },
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_list(key: &str) -> Vec<String> {
    env_var(key)
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Assembles a `ProviderConfig` for `provider` (a short name such as `stib`),
/// reading `<PROVIDER>_API_KEY`, `<PROVIDER>_GTFS_STATIC_API_KEY`,
/// `<PROVIDER>_GTFS_REALTIME_API_KEY`, `<PROVIDER>_MONITORED_LINES`,
/// `<PROVIDER>_STOP_IDS` (spec §6). Unknown `<PROVIDER>_*` keys are logged as
/// warnings, not silently dropped, per SPEC_FULL.md's "observability of
/// ignored configuration".
pub fn load_provider_config(provider: &str) -> ProviderConfig {
    let upper = provider.to_uppercase();
    let defaults = defaults_for(provider);

    warn_on_unknown_keys(&upper);

    ProviderConfig {
        name: provider.to_string(),
        api_url: env_var(&format!("{upper}_API_URL")),
        api_key: env_var(&format!("{upper}_API_KEY")),
        gtfs_url: env_var(&format!("{upper}_GTFS_URL")),
        gtfs_realtime_url: env_var(&format!("{upper}_GTFS_REALTIME_URL")),
        monitored_lines: env_list(&format!("{upper}_MONITORED_LINES")),
        stop_ids: env_list(&format!("{upper}_STOP_IDS")),
        rate_limit_delay: env_var(&format!("{upper}_RATE_LIMIT_DELAY_S"))
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(defaults.rate_limit_delay_s)),
        gtfs_cache_ttl: env_var(&format!("{upper}_GTFS_CACHE_TTL_S"))
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(defaults.gtfs_cache_ttl_s)),
        available_languages: defaults.available_languages.iter().map(|s| s.to_string()).collect(),
        default_timezone: defaults.default_timezone.to_string(),
    }
}

const KNOWN_SUFFIXES: &[&str] = &[
    "API_URL",
    "API_KEY",
    "GTFS_URL",
    "GTFS_STATIC_API_KEY",
    "GTFS_REALTIME_URL",
    "GTFS_REALTIME_API_KEY",
    "MONITORED_LINES",
    "STOP_IDS",
    "RATE_LIMIT_DELAY_S",
    "GTFS_CACHE_TTL_S",
    "AVAILABLE_LANGUAGES",
];

fn warn_on_unknown_keys(provider_upper: &str) {
    let prefix = format!("{provider_upper}_");
    for (key, _) in env::vars() {
        let Some(suffix) = key.strip_prefix(&prefix) else {
            continue;
        };
        if !KNOWN_SUFFIXES.contains(&suffix) {
            log::warn!("ignoring unrecognized configuration key {key:?}");
        }
    }
}

/// Which adapters to instantiate at startup, from `ENABLED_PROVIDERS`
/// (comma-separated). Empty/unset enables all three built-in adapters.
pub fn enabled_providers() -> Vec<String> {
    let configured = env_list("ENABLED_PROVIDERS");
    if configured.is_empty() {
        vec!["stib".to_string(), "delijn".to_string(), "bkk".to_string()]
    } else {
        configured
    }
}

/// `PROJECT_ROOT` env var, defaulting to the current working directory.
/// Fatal misconfiguration (spec §6 "non-zero on unrecoverable configuration
/// errors") is limited to paths that can't be canonicalized at all.
pub fn project_root() -> AppResult<std::path::PathBuf> {
    match env_var("PROJECT_ROOT") {
        Some(p) => Ok(std::path::PathBuf::from(p)),
        None => std::env::current_dir().map_err(|e| AppError::Config(e.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_applied_when_env_is_absent() {
        let cfg = load_provider_config("stib-test-unset");
        assert_eq!(cfg.rate_limit_delay, Duration::from_secs(10));
        assert_eq!(cfg.available_languages, vec!["en".to_string()]);
    }

    #[test]
    fn env_list_splits_and_trims() {
        std::env::set_var("TESTPROV_MONITORED_LINES", "1, 5 ,55");
        let cfg = load_provider_config("testprov");
        assert_eq!(cfg.monitored_lines, vec!["1", "5", "55"]);
        std::env::remove_var("TESTPROV_MONITORED_LINES");
    }
}
