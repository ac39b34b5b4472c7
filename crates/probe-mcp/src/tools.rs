use probe_core::ResourceIdentifier;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, TOOL_ERROR};
use crate::server::McpServer;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// A tool exposed over MCP; every tool only reads
struct ToolSpec {
    name: &'static str,
    description: &'static str,
    input_schema: fn() -> Value,
}

const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "probe_resolve",
        description: "Resolve a partial resource identifier (apiVersion, kind, resource, group) to one API resource type",
        input_schema: identifier_schema,
    },
    ToolSpec {
        name: "probe_api_resources",
        description: "List the preferred version of every API group the control plane serves",
        input_schema: empty_schema,
    },
    ToolSpec {
        name: "probe_list",
        description: "List objects of a resource type, optionally within a namespace or by label selector",
        input_schema: list_schema,
    },
    ToolSpec {
        name: "probe_get",
        description: "Get one object of a resource type by name",
        input_schema: get_schema,
    },
    ToolSpec {
        name: "probe_redact",
        description: "Redact secrets from an arbitrary JSON value",
        input_schema: redact_schema,
    },
];

#[derive(Debug, Deserialize)]
struct ResolveArgs {
    #[serde(flatten)]
    id: ResourceIdentifier,
    #[serde(default)]
    exact: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListArgs {
    #[serde(flatten)]
    id: ResourceIdentifier,
    namespace: Option<String>,
    label_selector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetArgs {
    #[serde(flatten)]
    id: ResourceIdentifier,
    name: String,
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RedactArgs {
    value: Value,
}

/// Run a tool and return its redacted result
pub async fn call_tool(server: &McpServer, params: &Value) -> anyhow::Result<Value> {
    let tool_name = params["name"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing tool name"))?;
    let args = match &params["arguments"] {
        Value::Null => json!({}),
        args => args.clone(),
    };

    if !TOOLS.iter().any(|t| t.name == tool_name) {
        anyhow::bail!("Unknown tool: {}", tool_name);
    }

    let call_id = Uuid::new_v4();
    debug!(%call_id, tool = tool_name, "calling tool");

    let inspector = &server.inspector;
    let result = match tool_name {
        "probe_resolve" => {
            let args: ResolveArgs = serde_json::from_value(args)?;
            let resolved = inspector.resolve(&args.id, args.exact).await?;
            serde_json::to_value(resolved)?
        }
        "probe_api_resources" => inspector.api_resources().await?,
        "probe_list" => {
            let args: ListArgs = serde_json::from_value(args)?;
            inspector
                .list(
                    &args.id,
                    args.namespace.as_deref(),
                    args.label_selector.as_deref(),
                )
                .await?
        }
        "probe_get" => {
            let args: GetArgs = serde_json::from_value(args)?;
            inspector
                .get(&args.id, &args.name, args.namespace.as_deref())
                .await?
        }
        "probe_redact" => {
            let args: RedactArgs = serde_json::from_value(args)?;
            args.value
        }
        _ => anyhow::bail!("Unknown tool: {}", tool_name),
    };

    // Results leave the process only through here
    Ok(inspector.redactor().redact_value(&result))
}

pub fn list_tools() -> Value {
    let tools: Vec<Value> = TOOLS
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": (t.input_schema)(),
                "annotations": { "readOnlyHint": true },
            })
        })
        .collect();

    json!({ "tools": tools })
}

/// Dispatch one JSON-RPC request; shared by the stdio and HTTP transports
pub async fn handle_jsonrpc(server: &McpServer, req: JsonRpcRequest) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => {
            let result = json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "probe", "version": env!("CARGO_PKG_VERSION") }
            });
            JsonRpcResponse::success(req.id, result)
        }
        "initialized" | "notifications/initialized" => JsonRpcResponse::success(req.id, json!({})),
        "ping" => JsonRpcResponse::success(req.id, json!({})),
        "tools/list" => JsonRpcResponse::success(req.id, list_tools()),
        "tools/call" => match call_tool(server, &req.params).await {
            Ok(result) => JsonRpcResponse::success(req.id, tool_result(&result)),
            Err(e) => {
                warn!(error = %e, "tool call failed");
                JsonRpcResponse::error(req.id, TOOL_ERROR, &e.to_string())
            }
        },
        _ => JsonRpcResponse::error(
            req.id,
            METHOD_NOT_FOUND,
            &format!("Method not found: {}", req.method),
        ),
    }
}

/// MCP content envelope around an already redacted value
fn tool_result(value: &Value) -> Value {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": value,
        "isError": false,
    })
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn identifier_properties() -> serde_json::Map<String, Value> {
    let properties = json!({
        "apiVersion": {"type": "string", "description": "group/version, or version for the core group"},
        "kind": {"type": "string", "description": "Kind, e.g. Deployment"},
        "resource": {"type": "string", "description": "Plural, singular or short name; may be qualified as resource.group"},
        "group": {"type": "string", "description": "API group; empty for the core group"}
    });
    match properties {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn identifier_schema() -> Value {
    let mut properties = identifier_properties();
    properties.insert(
        "exact".to_string(),
        json!({"type": "boolean", "default": false, "description": "Skip the best-effort scan"}),
    );
    json!({ "type": "object", "properties": properties })
}

fn list_schema() -> Value {
    let mut properties = identifier_properties();
    properties.insert("namespace".to_string(), json!({"type": "string"}));
    properties.insert(
        "labelSelector".to_string(),
        json!({"type": "string", "description": "e.g. app=web,tier!=db"}),
    );
    json!({ "type": "object", "properties": properties })
}

fn get_schema() -> Value {
    let mut properties = identifier_properties();
    properties.insert("name".to_string(), json!({"type": "string"}));
    properties.insert("namespace".to_string(), json!({"type": "string"}));
    json!({ "type": "object", "properties": properties, "required": ["name"] })
}

fn redact_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "value": {"description": "Any JSON value"} },
        "required": ["value"]
    })
}
