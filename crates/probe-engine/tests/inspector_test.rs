use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use probe_core::{ApiResource, ApiResourceList, DiscoverySnapshot, ResolveError, ResourceIdentifier};
use probe_discovery::CachedDiscovery;
use probe_engine::{InspectError, Inspector, ResourceQuery, ResourceSource};
use probe_security::Redactor;
use serde_json::{Value, json};

/// Serves canned objects keyed by REST path and records every query
#[derive(Default)]
struct MemorySource {
    objects: HashMap<String, Value>,
    queries: Mutex<Vec<ResourceQuery>>,
}

impl MemorySource {
    fn with(mut self, path: &str, value: Value) -> Self {
        self.objects.insert(path.to_string(), value);
        self
    }

    fn queries(&self) -> Vec<ResourceQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceSource for MemorySource {
    async fn fetch(&self, query: &ResourceQuery) -> probe_engine::Result<Value> {
        self.queries.lock().unwrap().push(query.clone());
        self.objects
            .get(&query.path())
            .cloned()
            .ok_or_else(|| InspectError::ObjectNotFound(query.path()))
    }
}

fn snapshot() -> DiscoverySnapshot {
    DiscoverySnapshot::new(vec![
        ApiResourceList::new(
            "v1",
            vec![
                ApiResource::new("pods", "Pod", true).with_short_names(&["po"]),
                ApiResource::new("pods/log", "Pod", true),
                ApiResource::new("secrets", "Secret", true),
                ApiResource::new("nodes", "Node", false).with_short_names(&["no"]),
            ],
        ),
        ApiResourceList::new(
            "apps/v1",
            vec![ApiResource::new("deployments", "Deployment", true).with_short_names(&["deploy"])],
        ),
        ApiResourceList::new(
            "example.com/v1",
            vec![ApiResource::new("widgets", "Widget", true)],
        ),
        ApiResourceList::new(
            "example.org/v1",
            vec![ApiResource::new("widgets", "Widget", true)],
        ),
    ])
}

fn inspector(source: Arc<MemorySource>) -> Inspector {
    Inspector::new(
        Arc::new(CachedDiscovery::from_snapshot(snapshot())),
        source,
        Arc::new(Redactor::new()),
    )
}

#[tokio::test]
async fn test_list_redacts_and_wraps() {
    let source = Arc::new(MemorySource::default().with(
        "/api/v1/namespaces/default/pods",
        json!({
            "kind": "PodList",
            "items": [{
                "metadata": {"name": "web-0"},
                "spec": {"containers": [{"env": [{"name": "DB_URL", "value": "postgres://app:hunter2@db/app"}]}]},
                "metadata_annotations": {"apiToken": "abc"},
            }]
        }),
    ));
    let inspector = inspector(source.clone());

    let out = inspector
        .list(&ResourceIdentifier::new().with_resource("po"), Some("default"), None)
        .await
        .unwrap();

    assert_eq!(
        out["resource"],
        json!({"group": "", "version": "v1", "resource": "pods", "namespaced": true})
    );
    let pod = &out["items"][0];
    assert_eq!(pod["metadata"]["name"], "web-0");
    assert_eq!(pod["metadata_annotations"]["apiToken"], "[REDACTED]");
    let url = pod["spec"]["containers"][0]["env"][0]["value"].as_str().unwrap();
    assert!(!url.contains("hunter2"));
    assert_eq!(source.queries().len(), 1);
}

#[tokio::test]
async fn test_list_with_label_selector() {
    let source = Arc::new(
        MemorySource::default().with("/apis/apps/v1/deployments", json!({"items": []})),
    );
    let inspector = inspector(source.clone());

    let out = inspector
        .list(
            &ResourceIdentifier::new().with_resource("deployments.apps"),
            None,
            Some("app=web"),
        )
        .await
        .unwrap();

    assert_eq!(out["items"], json!([]));
    assert_eq!(source.queries()[0].label_selector.as_deref(), Some("app=web"));
}

#[tokio::test]
async fn test_namespace_rejected_for_cluster_scoped() {
    let source = Arc::new(MemorySource::default());
    let inspector = inspector(source.clone());

    let err = inspector
        .list(&ResourceIdentifier::new().with_kind("Node"), Some("default"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, InspectError::ClusterScoped { .. }));
    assert!(source.queries().is_empty());
}

#[tokio::test]
async fn test_get_requires_namespace_for_namespaced() {
    let inspector = inspector(Arc::new(MemorySource::default()));
    let err = inspector
        .get(&ResourceIdentifier::new().with_resource("pods"), "web-0", None)
        .await
        .unwrap_err();
    assert!(matches!(err, InspectError::NamespaceRequired { .. }));
}

#[tokio::test]
async fn test_get_blanks_secret_data() {
    let source = Arc::new(MemorySource::default().with(
        "/api/v1/namespaces/prod/secrets/db",
        json!({
            "metadata": {"name": "db"},
            "type": "Opaque",
            "data": {"username": "YWRtaW4=", "url": "cG9zdGdyZXM6Ly9kYg=="},
        }),
    ));
    let inspector = inspector(source);

    let out = inspector
        .get(&ResourceIdentifier::new().with_kind("Secret"), "db", Some("prod"))
        .await
        .unwrap();

    let secret = &out["items"][0];
    assert_eq!(secret["data"]["username"], "[REDACTED]");
    assert_eq!(secret["data"]["url"], "[REDACTED]");
    assert_eq!(secret["type"], "Opaque");
}

#[tokio::test]
async fn test_ambiguous_identifier_surfaces_candidates() {
    let inspector = inspector(Arc::new(MemorySource::default()));
    let err = inspector
        .list(&ResourceIdentifier::new().with_kind("Widget"), None, None)
        .await
        .unwrap_err();

    match err {
        InspectError::Resolve(ResolveError::Ambiguous { candidates, .. }) => {
            assert_eq!(
                candidates,
                vec!["example.com/v1/widgets", "example.org/v1/widgets"]
            );
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_object() {
    let inspector = inspector(Arc::new(MemorySource::default()));
    let err = inspector
        .get(&ResourceIdentifier::new().with_kind("Node"), "worker-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, InspectError::ObjectNotFound(_)));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn test_api_resources() {
    let inspector = inspector(Arc::new(MemorySource::default()));
    let out = inspector.api_resources().await.unwrap();

    let lists = out["lists"].as_array().unwrap();
    assert_eq!(lists.len(), 4);
    assert_eq!(lists[0]["groupVersion"], "v1");
}

#[tokio::test]
async fn test_resolve_exact_and_best_effort() {
    let inspector = inspector(Arc::new(MemorySource::default()));

    let id = ResourceIdentifier::new()
        .with_api_version("apps/v1")
        .with_kind("Deployment");
    let exact = inspector.resolve(&id, true).await.unwrap();
    assert_eq!(exact.gvr.to_string(), "apps/v1/deployments");

    let err = inspector
        .resolve(&ResourceIdentifier::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, InspectError::Resolve(ResolveError::InvalidInput(_))));
}

#[tokio::test]
async fn test_get_rejects_names_that_escape_the_collection() {
    let source = Arc::new(MemorySource::default().with(
        "/api/v1/namespaces/default/secrets/db",
        json!({"metadata": {"name": "db"}, "data": {"user": "YWRtaW4=", "pass": "aHVudGVyMg=="}}),
    ));
    let inspector = inspector(source.clone());

    for name in ["../secrets/db", "..", "web/0"] {
        let err = inspector
            .get(&ResourceIdentifier::new().with_resource("pods"), name, Some("default"))
            .await
            .unwrap_err();
        assert!(matches!(err, InspectError::InvalidInput(_)), "{name:?}");
    }

    let err = inspector
        .list(&ResourceIdentifier::new().with_resource("pods"), Some("../kube-system"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, InspectError::InvalidInput(_)));
    assert!(source.queries().is_empty());
}
