//! Upstream API configuration: base URIs, credentials and resource paths.

use crate::models::{Credentials, ForwardMethod, ResourceKind, ResourceRoute};
use std::env;
use url::Url;

/// Errors raised while loading configuration at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Static description of the proxied API, loaded once at process start
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub api_base_uri: Url,
    pub login_base_uri: Url,
    pub login_path: String,
    pub credentials: Credentials,
    pub cities_path: String,
    pub page_content_path: String,
    pub statistics_path: String,
    pub submission_path: String,
}

impl UpstreamConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let api_base_raw = required("LIVIS_API_BASE_URI")?;
        let api_base_uri = Url::parse(&api_base_raw).map_err(|source| ConfigError::InvalidUrl {
            var: "LIVIS_API_BASE_URI",
            source,
        })?;

        let login_base_uri = match get("LIVIS_API_LOGIN_BASE_URI") {
            Some(raw) => Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
                var: "LIVIS_API_LOGIN_BASE_URI",
                source,
            })?,
            None => api_base_uri.clone(),
        };

        let credentials = Credentials::new(
            required("LIVIS_API_USERNAME")?,
            required("LIVIS_API_PASSWORD")?,
        );

        Ok(Self {
            api_base_uri,
            login_base_uri,
            login_path: get("LIVIS_API_LOGIN_PATH").unwrap_or_else(|| "/login".to_string()),
            credentials,
            cities_path: get("LIVIS_API_CITIES_PATH").unwrap_or_else(|| "/cities".to_string()),
            page_content_path: get("LIVIS_API_PAGE_CONTENT_PATH")
                .unwrap_or_else(|| "/page-content".to_string()),
            statistics_path: get("LIVIS_API_STATISTICS_PATH")
                .unwrap_or_else(|| "/statistics".to_string()),
            submission_path: get("LIVIS_API_SUBMISSION_PATH")
                .unwrap_or_else(|| "/submissions".to_string()),
        })
    }

    /// Config pointing both the API and the login endpoint at one base URI,
    /// with default paths. Mostly useful against mock servers.
    pub fn for_base_uri(base_uri: &str, credentials: Credentials) -> Result<Self, ConfigError> {
        let base = base_uri.to_string();
        let username = credentials.username.clone();
        let password = credentials.password.clone();

        Self::from_lookup(move |name| match name {
            "LIVIS_API_BASE_URI" => Some(base.clone()),
            "LIVIS_API_USERNAME" => Some(username.clone()),
            "LIVIS_API_PASSWORD" => Some(password.clone()),
            _ => None,
        })
    }

    /// Full URL of the login endpoint
    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        join_path(&self.login_base_uri, &self.login_path)
    }

    /// Route descriptors for every proxied resource
    pub fn resource_routes(&self) -> Vec<ResourceRoute> {
        vec![
            ResourceRoute {
                kind: ResourceKind::Cities,
                method: ForwardMethod::Get,
                route: "/api/cities",
                upstream_path: self.cities_path.clone(),
                takes_id: false,
            },
            ResourceRoute {
                kind: ResourceKind::PageContent,
                method: ForwardMethod::Get,
                route: "/api/page-content",
                upstream_path: self.page_content_path.clone(),
                takes_id: false,
            },
            ResourceRoute {
                kind: ResourceKind::StatisticsCollection,
                method: ForwardMethod::Get,
                route: "/api/statistics",
                upstream_path: self.statistics_path.clone(),
                takes_id: false,
            },
            ResourceRoute {
                kind: ResourceKind::StatisticsResource,
                method: ForwardMethod::Get,
                route: "/api/statistics/{id}",
                upstream_path: self.statistics_path.clone(),
                takes_id: true,
            },
            ResourceRoute {
                kind: ResourceKind::Submission,
                method: ForwardMethod::Post,
                route: "/api/submission",
                upstream_path: self.submission_path.clone(),
                takes_id: false,
            },
        ]
    }
}

/// Append `path` to `base`, keeping any path prefix the base already has.
pub fn join_path(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Ok(base.clone());
    }

    Url::parse(&format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Mutex to synchronize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_required_values() {
        let config = UpstreamConfig::from_lookup(lookup_from(&[
            ("LIVIS_API_BASE_URI", "https://api.example.com/v1"),
            ("LIVIS_API_USERNAME", "api@example.com"),
            ("LIVIS_API_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.login_base_uri, config.api_base_uri);
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.cities_path, "/cities");
        assert_eq!(config.submission_path, "/submissions");
        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://api.example.com/v1/login"
        );
    }

    #[test]
    fn test_missing_credentials_are_rejected() {
        let result = UpstreamConfig::from_lookup(lookup_from(&[(
            "LIVIS_API_BASE_URI",
            "https://api.example.com",
        )]));

        assert!(matches!(result, Err(ConfigError::Missing("LIVIS_API_USERNAME"))));
    }

    #[test]
    fn test_invalid_base_uri_is_rejected() {
        let result = UpstreamConfig::from_lookup(lookup_from(&[
            ("LIVIS_API_BASE_URI", "not a url"),
            ("LIVIS_API_USERNAME", "u"),
            ("LIVIS_API_PASSWORD", "p"),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidUrl {
                var: "LIVIS_API_BASE_URI",
                ..
            })
        ));
    }

    #[test]
    fn test_separate_login_base_uri() {
        let config = UpstreamConfig::from_lookup(lookup_from(&[
            ("LIVIS_API_BASE_URI", "https://api.example.com"),
            ("LIVIS_API_LOGIN_BASE_URI", "https://auth.example.com/"),
            ("LIVIS_API_LOGIN_PATH", "/api/login_check"),
            ("LIVIS_API_USERNAME", "u"),
            ("LIVIS_API_PASSWORD", "p"),
        ]))
        .unwrap();

        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://auth.example.com/api/login_check"
        );
    }

    #[test]
    fn test_resource_routes_cover_every_resource() {
        let config = UpstreamConfig::for_base_uri(
            "https://api.example.com",
            Credentials::new("u", "p"),
        )
        .unwrap();
        let routes = config.resource_routes();

        assert_eq!(routes.len(), 5);
        let submission = routes
            .iter()
            .find(|r| r.kind == ResourceKind::Submission)
            .unwrap();
        assert_eq!(submission.method, ForwardMethod::Post);
        let item = routes
            .iter()
            .find(|r| r.kind == ResourceKind::StatisticsResource)
            .unwrap();
        assert!(item.takes_id);
        assert_eq!(item.upstream_path, "/statistics");
    }

    #[test]
    fn test_join_path() {
        let base = Url::parse("http://127.0.0.1:1234").unwrap();
        assert_eq!(
            join_path(&base, "/cities").unwrap().as_str(),
            "http://127.0.0.1:1234/cities"
        );
        assert_eq!(join_path(&base, "").unwrap(), base);
    }

    #[test]
    fn test_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        unsafe {
            env::set_var("LIVIS_API_BASE_URI", "https://api.example.com");
            env::set_var("LIVIS_API_USERNAME", "env-user");
            env::set_var("LIVIS_API_PASSWORD", "env-pass");
            env::set_var("LIVIS_API_CITIES_PATH", "/v2/cities");
        }

        let config = UpstreamConfig::from_env().unwrap();
        assert_eq!(config.credentials.username, "env-user");
        assert_eq!(config.cities_path, "/v2/cities");

        unsafe {
            env::remove_var("LIVIS_API_BASE_URI");
            env::remove_var("LIVIS_API_USERNAME");
            env::remove_var("LIVIS_API_PASSWORD");
            env::remove_var("LIVIS_API_CITIES_PATH");
        }
    }
}
