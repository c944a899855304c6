//! Per-request forwarding types and per-resource route descriptors.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// HTTP verbs the proxy forwards upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMethod {
    Get,
    Post,
}

impl ForwardMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardMethod::Get => "GET",
            ForwardMethod::Post => "POST",
        }
    }
}

impl fmt::Display for ForwardMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ForwardMethod> for actix_web::http::Method {
    fn from(method: ForwardMethod) -> Self {
        match method {
            ForwardMethod::Get => actix_web::http::Method::GET,
            ForwardMethod::Post => actix_web::http::Method::POST,
        }
    }
}

impl From<ForwardMethod> for reqwest::Method {
    fn from(method: ForwardMethod) -> Self {
        match method {
            ForwardMethod::Get => reqwest::Method::GET,
            ForwardMethod::Post => reqwest::Method::POST,
        }
    }
}

/// A query value after normalization: numeric strings become integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Int(i64),
    Text(String),
}

/// Everything needed to issue one upstream call for one inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardSpec {
    pub method: ForwardMethod,
    pub upstream_path: String,
    /// Appended to `upstream_path` as a single path segment
    pub resource_id: Option<String>,
    /// Raw inbound query pairs, normalized by the forwarder
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ForwardSpec {
    pub fn new(method: ForwardMethod, upstream_path: impl Into<String>) -> Self {
        Self {
            method,
            upstream_path: upstream_path.into(),
            resource_id: None,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The upstream resources exposed by the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cities,
    PageContent,
    StatisticsCollection,
    StatisticsResource,
    Submission,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Cities => "cities",
            ResourceKind::PageContent => "page_content",
            ResourceKind::StatisticsCollection => "statistics_collection",
            ResourceKind::StatisticsResource => "statistics_resource",
            ResourceKind::Submission => "submission",
        }
    }
}

/// Descriptor binding an inbound route to an upstream path and verb.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRoute {
    pub kind: ResourceKind,
    pub method: ForwardMethod,
    /// Inbound actix route pattern, e.g. `/api/statistics/{id}`
    pub route: &'static str,
    pub upstream_path: String,
    /// Whether the `{id}` route segment is appended upstream
    pub takes_id: bool,
}

impl ResourceRoute {
    /// Build the forward spec for one inbound request on this route
    pub fn forward_spec(
        &self,
        resource_id: Option<String>,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> ForwardSpec {
        let mut spec = ForwardSpec::new(self.method, self.upstream_path.clone()).with_query(query);

        if self.takes_id {
            spec.resource_id = resource_id;
        }
        spec.body = body;

        spec
    }
}
