//! Maps a `ForwardSpec` onto an upstream call.

use crate::config::upstream::join_path;
use crate::models::{ForwardSpec, QueryValue};
use crate::services::upstream_client::{
    UpstreamClient, UpstreamClientError, UpstreamRequest, UpstreamResponse,
};
use url::Url;

/// Inbound key that stands in for `city.name`, which cannot travel through
/// some clients' query encoding with its dot intact.
const CITY_NAME_ALIAS: &str = "city_name";
const CITY_NAME_KEY: &str = "city.name";

/// Issues resource calls against the upstream API with a bearer token.
#[derive(Clone)]
pub struct RequestForwarder {
    client: UpstreamClient,
    base_uri: Url,
}

impl RequestForwarder {
    pub fn new(client: UpstreamClient, base_uri: Url) -> Self {
        Self { client, base_uri }
    }

    /// Send the call described by `spec`.
    ///
    /// Upstream 4xx/5xx answers come back as `Ok` with their status and body.
    pub async fn forward(
        &self,
        spec: &ForwardSpec,
        token: &str,
    ) -> Result<UpstreamResponse, UpstreamClientError> {
        let url = self.upstream_url(spec)?;
        let mut request = UpstreamRequest::new(spec.method, url)
            .bearer(token)
            .query(normalize_query(&spec.query));
        if let Some(body) = &spec.body {
            request = request.json(body.clone());
        }

        self.client.send(request).await
    }

    /// `{base}{path}` plus the optional `/{id}` segment
    pub fn upstream_url(&self, spec: &ForwardSpec) -> Result<Url, UpstreamClientError> {
        let mut url = join_path(&self.base_uri, &spec.upstream_path)
            .map_err(|e| UpstreamClientError::InvalidUrl(e.to_string()))?;

        if let Some(id) = &spec.resource_id {
            if url.cannot_be_a_base() {
                return Err(UpstreamClientError::InvalidUrl(format!(
                    "{url} cannot take path segments"
                )));
            }
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(id);
            }
        }

        Ok(url)
    }
}

/// Rename `city_name` to `city.name` and turn numeric values into integers.
pub fn normalize_query(pairs: &[(String, String)]) -> Vec<(String, QueryValue)> {
    pairs
        .iter()
        .map(|(key, value)| {
            let key = if key == CITY_NAME_ALIAS {
                CITY_NAME_KEY.to_string()
            } else {
                key.clone()
            };
            (key, coerce_value(value))
        })
        .collect()
}

/// Numeric text becomes an integer, truncating fractions toward zero.
/// Out-of-range values clamp to `i64::MIN`/`i64::MAX`.
fn coerce_value(value: &str) -> QueryValue {
    let trimmed = value.trim();

    if let Ok(int) = trimmed.parse::<i64>() {
        return QueryValue::Int(int);
    }

    // `f64::from_str` also accepts "inf" and "NaN", which are not numbers here
    let looks_numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && trimmed.chars().any(|c| c.is_ascii_digit());
    if looks_numeric {
        if let Ok(float) = trimmed.parse::<f64>() {
            // `as` saturates at the i64 bounds
            if float.is_finite() {
                return QueryValue::Int(float.trunc() as i64);
            }
        }
    }

    QueryValue::Text(value.to_string())
}
