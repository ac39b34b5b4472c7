use std::sync::Arc;

use probe_core::{
    Discovery, ResolvedResource, ResourceIdentifier, resolve_best_effort, resolve_exact,
};
use probe_discovery::CachedDiscovery;
use probe_security::{REDACTION_MARKER, Redactor};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{InspectError, Result};
use crate::source::{ResourceQuery, ResourceSource};

/// Resolve, fetch, redact.
///
/// Every value an `Inspector` hands out has been through the redactor.
pub struct Inspector {
    discovery: Arc<CachedDiscovery>,
    source: Arc<dyn ResourceSource>,
    redactor: Arc<Redactor>,
}

impl Inspector {
    pub fn new(
        discovery: Arc<CachedDiscovery>,
        source: Arc<dyn ResourceSource>,
        redactor: Arc<Redactor>,
    ) -> Self {
        Self {
            discovery,
            source,
            redactor,
        }
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn discovery(&self) -> &CachedDiscovery {
        &self.discovery
    }

    pub async fn resolve(&self, id: &ResourceIdentifier, exact: bool) -> Result<ResolvedResource> {
        let snapshot = self.discovery.current().await?;
        let resolved = if exact {
            resolve_exact(snapshot.as_ref(), id)?
        } else {
            resolve_best_effort(snapshot.as_ref(), id)?
        };
        debug!(identifier = %id, resolved = %resolved.gvr, "resolved resource type");
        Ok(resolved)
    }

    /// List objects of the identified type, across all namespaces when none is given
    pub async fn list(
        &self,
        id: &ResourceIdentifier,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Value> {
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            check_path_segment("namespace", ns)?;
        }
        let resource = self.resolve(id, false).await?;
        check_scope(&resource, namespace)?;

        let query = ResourceQuery::list(resource.clone())
            .with_namespace(namespace)
            .with_label_selector(label_selector);
        let response = self.source.fetch(&query).await?;

        let items = match response {
            Value::Object(mut map) if map.contains_key("items") => {
                map.remove("items").unwrap_or(Value::Null)
            }
            other => other,
        };
        Ok(self.wrap(&resource, items))
    }

    /// Get one object by name
    pub async fn get(
        &self,
        id: &ResourceIdentifier,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value> {
        check_path_segment("name", name)?;
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            check_path_segment("namespace", ns)?;
        }
        let resource = self.resolve(id, false).await?;
        check_scope(&resource, namespace)?;
        if resource.namespaced && namespace.is_none_or(str::is_empty) {
            return Err(InspectError::NamespaceRequired {
                resource: resource.gvr.to_string(),
                name: name.to_string(),
            });
        }

        let query = ResourceQuery::list(resource.clone())
            .with_namespace(namespace)
            .with_name(name);
        let object = self.source.fetch(&query).await?;
        Ok(self.wrap(&resource, Value::Array(vec![object])))
    }

    /// Preferred resource lists of the current snapshot
    pub async fn api_resources(&self) -> Result<Value> {
        let snapshot = self.discovery.current().await?;
        let preferred = snapshot.preferred_resources()?;
        Ok(self.redactor.redact_value(&json!(preferred)))
    }

    fn wrap(&self, resource: &ResolvedResource, mut items: Value) -> Value {
        if is_core_secrets(resource) {
            blank_secret_payloads(&mut items);
        }
        let wrapped = json!({
            "resource": resource,
            "items": items,
        });
        self.redactor.redact_value(&wrapped)
    }
}

fn check_scope(resource: &ResolvedResource, namespace: Option<&str>) -> Result<()> {
    match namespace {
        Some(ns) if !ns.is_empty() && !resource.namespaced => Err(InspectError::ClusterScoped {
            resource: resource.gvr.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Names and namespaces must each stay a single path segment
fn check_path_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains('/') {
        return Err(InspectError::InvalidInput(format!(
            "{field} {value:?} is not a valid object {field}"
        )));
    }
    Ok(())
}

fn is_core_secrets(resource: &ResolvedResource) -> bool {
    resource.gvr.group.is_empty() && resource.gvr.resource == "secrets"
}

/// Secret payloads are opaque base64 that content rules cannot recognize
fn blank_secret_payloads(items: &mut Value) {
    let objects: Vec<&mut Value> = match items {
        Value::Array(list) => list.iter_mut().collect(),
        other => vec![other],
    };
    for object in objects {
        for field in ["data", "stringData"] {
            if let Some(Value::Object(entries)) = object.get_mut(field) {
                for value in entries.values_mut() {
                    *value = Value::String(REDACTION_MARKER.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_core::GroupVersionResource;

    #[test]
    fn test_check_scope() {
        let nodes = ResolvedResource::new(GroupVersionResource::new("", "v1", "nodes"), false);
        assert!(check_scope(&nodes, None).is_ok());
        assert!(check_scope(&nodes, Some("")).is_ok());
        assert!(matches!(
            check_scope(&nodes, Some("default")),
            Err(InspectError::ClusterScoped { .. })
        ));
    }

    #[test]
    fn test_check_path_segment() {
        assert!(check_path_segment("name", "web-0").is_ok());
        assert!(check_path_segment("name", "a.b.c").is_ok());
        for bad in ["", ".", "..", "../secrets/db", "web/0"] {
            assert!(
                matches!(check_path_segment("name", bad), Err(InspectError::InvalidInput(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_blank_secret_payloads() {
        let mut items = json!([{
            "metadata": {"name": "db"},
            "data": {"user": "YWRtaW4=", "pass": "aHVudGVyMg=="},
            "stringData": {"note": "plain"},
            "type": "Opaque",
        }]);
        blank_secret_payloads(&mut items);

        assert_eq!(items[0]["data"]["user"], "[REDACTED]");
        assert_eq!(items[0]["data"]["pass"], "[REDACTED]");
        assert_eq!(items[0]["stringData"]["note"], "[REDACTED]");
        assert_eq!(items[0]["type"], "Opaque");
        assert_eq!(items[0]["metadata"]["name"], "db");
    }
}
