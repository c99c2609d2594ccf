use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_CMS_API_BASE_URL: &str = "https://cms.medikost.id/api/v1/";
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;

pub fn server_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn static_dir() -> PathBuf {
    std::env::var("STATIC_DIR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

/// Base URL of the listing CMS, always ending in `/` so relative paths join
/// underneath it. Unparseable values fall back to the default.
pub fn cms_api_base_url() -> Option<reqwest::Url> {
    let raw = std::env::var("CMS_API_BASE_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CMS_API_BASE_URL.to_string());
    let normalized = if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    };

    match reqwest::Url::parse(&normalized) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        _ => {
            tracing::warn!(value = %normalized, "invalid CMS_API_BASE_URL, using default");
            reqwest::Url::parse(DEFAULT_CMS_API_BASE_URL).ok()
        }
    }
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        temp_env::with_vars_unset(
            [
                "PORT",
                "STATIC_DIR",
                "CMS_API_BASE_URL",
                "UPSTREAM_HTTP_TIMEOUT_SECS",
                "UPSTREAM_CONNECT_TIMEOUT_SECS",
            ],
            || {
                assert_eq!(server_port(), 3000);
                assert_eq!(static_dir(), PathBuf::from("client/dist"));
                assert_eq!(
                    cms_api_base_url().map(String::from).as_deref(),
                    Some(DEFAULT_CMS_API_BASE_URL)
                );
                assert_eq!(upstream_http_timeout(), Duration::from_secs(10));
                assert_eq!(upstream_connect_timeout(), Duration::from_secs(3));
            },
        );
    }

    #[test]
    fn env_overrides_are_parsed() {
        temp_env::with_vars(
            [
                ("PORT", Some("8080")),
                ("STATIC_DIR", Some("/srv/medikost")),
                ("CMS_API_BASE_URL", Some("http://127.0.0.1:9000/api/v1")),
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("25")),
                ("UPSTREAM_CONNECT_TIMEOUT_SECS", Some("5")),
            ],
            || {
                assert_eq!(server_port(), 8080);
                assert_eq!(static_dir(), PathBuf::from("/srv/medikost"));
                assert_eq!(
                    cms_api_base_url().map(String::from).as_deref(),
                    Some("http://127.0.0.1:9000/api/v1/")
                );
                assert_eq!(upstream_http_timeout(), Duration::from_secs(25));
                assert_eq!(upstream_connect_timeout(), Duration::from_secs(5));
            },
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        temp_env::with_vars(
            [
                ("PORT", Some("0")),
                ("STATIC_DIR", Some("   ")),
                ("CMS_API_BASE_URL", Some("ftp://cms.example")),
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("0")),
                ("UPSTREAM_CONNECT_TIMEOUT_SECS", Some("soon")),
            ],
            || {
                assert_eq!(server_port(), 3000);
                assert_eq!(static_dir(), PathBuf::from("client/dist"));
                assert_eq!(
                    cms_api_base_url().map(String::from).as_deref(),
                    Some(DEFAULT_CMS_API_BASE_URL)
                );
                assert_eq!(upstream_http_timeout(), Duration::from_secs(10));
                assert_eq!(upstream_connect_timeout(), Duration::from_secs(3));
            },
        );
    }
}
