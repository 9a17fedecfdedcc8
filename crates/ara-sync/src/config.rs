use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ara_adapters::{SMPA_LIST_URL, SPATIC_LIST_URL};
use ara_core::GeoPoint;
use ara_geo::{GeoResolverConfig, DEFAULT_THRESHOLD_METERS};
use ara_storage::{HttpClientConfig, RetryPolicy};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: String,
    pub artifacts_dir: PathBuf,
    /// Keep downloaded bulletins after parsing instead of discarding them.
    pub keep_artifacts: bool,
    pub reports_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub retry_attempts: usize,
    pub retry_base_ms: u64,
    pub kakao_api_key: Option<String>,
    pub home_city: String,
    pub home_district: String,
    pub default_point: GeoPoint,
    pub geocode_delay_ms: u64,
    pub route_threshold_meters: f64,
    pub run_timeout_secs: u64,
    pub webdriver_url: Option<String>,
    pub smpa_list_url: String,
    pub spatic_list_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:ara.db?mode=rwc".to_string(),
            artifacts_dir: std::env::temp_dir().join("ara-bulletins"),
            keep_artifacts: false,
            reports_dir: PathBuf::from("./reports"),
            user_agent: "Mozilla/5.0 (compatible; ara-bot/0.1)".to_string(),
            http_timeout_secs: 20,
            retry_attempts: 3,
            retry_base_ms: 2000,
            kakao_api_key: None,
            home_city: "서울".to_string(),
            home_district: "서울특별시 종로구".to_string(),
            default_point: GeoPoint::new(37.5709, 126.9769),
            geocode_delay_ms: 50,
            route_threshold_meters: DEFAULT_THRESHOLD_METERS,
            run_timeout_secs: 600,
            webdriver_url: None,
            smpa_list_url: SMPA_LIST_URL.to_string(),
            spatic_list_url: SPATIC_LIST_URL.to_string(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_string(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env_string("DATABASE_URL").unwrap_or(defaults.database_url),
            artifacts_dir: env_string("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifacts_dir),
            keep_artifacts: env_string("ARA_KEEP_ARTIFACTS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
                .unwrap_or(defaults.keep_artifacts),
            reports_dir: env_string("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reports_dir),
            user_agent: env_string("ARA_USER_AGENT").unwrap_or(defaults.user_agent),
            http_timeout_secs: env_parse("ARA_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            retry_attempts: env_parse("ARA_RETRY_ATTEMPTS", defaults.retry_attempts).max(1),
            retry_base_ms: env_parse("ARA_RETRY_BASE_MS", defaults.retry_base_ms),
            kakao_api_key: env_string("KAKAO_REST_API_KEY"),
            home_city: env_string("ARA_HOME_CITY").unwrap_or(defaults.home_city),
            home_district: env_string("ARA_HOME_DISTRICT").unwrap_or(defaults.home_district),
            default_point: GeoPoint::new(
                env_parse("ARA_DEFAULT_LAT", defaults.default_point.lat),
                env_parse("ARA_DEFAULT_LON", defaults.default_point.lon),
            ),
            geocode_delay_ms: env_parse("ARA_GEOCODE_DELAY_MS", defaults.geocode_delay_ms),
            route_threshold_meters: env_parse(
                "ARA_ROUTE_THRESHOLD_METERS",
                defaults.route_threshold_meters,
            ),
            run_timeout_secs: env_parse("ARA_RUN_TIMEOUT_SECS", defaults.run_timeout_secs),
            webdriver_url: env_string("ARA_WEBDRIVER_URL"),
            smpa_list_url: env_string("ARA_SMPA_LIST_URL").unwrap_or(defaults.smpa_list_url),
            spatic_list_url: env_string("ARA_SPATIC_LIST_URL").unwrap_or(defaults.spatic_list_url),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_ms),
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
            retry: self.retry_policy(),
            ..Default::default()
        }
    }

    pub fn resolver_config(&self) -> GeoResolverConfig {
        GeoResolverConfig {
            home_city: self.home_city.clone(),
            candidate_delay: Duration::from_millis(self.geocode_delay_ms),
            fallback: self.default_point,
            ..Default::default()
        }
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_settings_follow_the_config() {
        let config = SyncConfig {
            retry_attempts: 5,
            retry_base_ms: 250,
            geocode_delay_ms: 0,
            home_city: "부산".into(),
            ..SyncConfig::default()
        };
        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.delay_after_attempt(2), Duration::from_millis(500));

        let http = config.http_client_config();
        assert_eq!(http.user_agent.as_deref(), Some("Mozilla/5.0 (compatible; ara-bot/0.1)"));
        assert_eq!(http.retry.max_attempts, 5);

        let resolver = config.resolver_config();
        assert_eq!(resolver.home_city, "부산");
        assert!(resolver.candidate_delay.is_zero());
        assert_eq!(resolver.fallback, GeoPoint::new(37.5709, 126.9769));
    }
}
