//! Where list/get requests are served from

use std::time::Duration;

use async_trait::async_trait;
use probe_core::ResolvedResource;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::{InspectError, Result};

/// One read against the control plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub resource: ResolvedResource,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub label_selector: Option<String>,
}

impl ResourceQuery {
    pub fn list(resource: ResolvedResource) -> Self {
        Self {
            resource,
            namespace: None,
            name: None,
            label_selector: None,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.filter(|n| !n.is_empty()).map(str::to_string);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_label_selector(mut self, selector: Option<&str>) -> Self {
        self.label_selector = selector.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// Path segments of the collection or object
    pub fn segments(&self) -> Vec<&str> {
        let gvr = &self.resource.gvr;
        let mut segments = if gvr.group.is_empty() {
            vec!["api", gvr.version.as_str()]
        } else {
            vec!["apis", gvr.group.as_str(), gvr.version.as_str()]
        };
        if let Some(namespace) = &self.namespace {
            segments.extend(["namespaces", namespace.as_str()]);
        }
        segments.push(gvr.resource.as_str());
        if let Some(name) = &self.name {
            segments.push(name.as_str());
        }
        segments
    }

    /// REST path of the collection or object, without the query string
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }
}

/// Fetches raw, unredacted objects for a resolved query
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch(&self, query: &ResourceQuery) -> Result<Value>;
}

/// Reads objects from the control-plane REST API
pub struct HttpResourceSource {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpResourceSource {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
        insecure_skip_tls_verify: bool,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| InspectError::Source(format!("invalid server URL {base_url:?}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_skip_tls_verify)
            .build()
            .map_err(|e| InspectError::Source(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Each segment is percent-encoded, so a name can never leave its collection
    pub(crate) fn url_for(&self, query: &ResourceQuery) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| InspectError::Source(format!("server URL {} has no path", self.base_url)))?
            .pop_if_empty()
            .extend(query.segments());
        if let Some(selector) = &query.label_selector {
            url.query_pairs_mut().append_pair("labelSelector", selector);
        }
        Ok(url)
    }
}

#[async_trait]
impl ResourceSource for HttpResourceSource {
    async fn fetch(&self, query: &ResourceQuery) -> Result<Value> {
        let url = self.url_for(query)?;
        debug!(%url, "fetching resources");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| InspectError::Source(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(InspectError::ObjectNotFound(query.path())),
            status if !status.is_success() => Err(InspectError::Source(format!(
                "GET {}: HTTP {status}",
                query.path()
            ))),
            _ => response
                .json::<Value>()
                .await
                .map_err(|e| InspectError::Source(format!("invalid response: {e}"))),
        }
    }
}

/// Stands in when no control-plane server is configured
pub struct OfflineSource;

#[async_trait]
impl ResourceSource for OfflineSource {
    async fn fetch(&self, query: &ResourceQuery) -> Result<Value> {
        Err(InspectError::Source(format!(
            "no server configured to serve {}",
            query.path()
        )))
    }
}
