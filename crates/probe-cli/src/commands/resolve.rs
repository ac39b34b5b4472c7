use anyhow::Result;
use probe_config::Config;
use probe_core::ResourceIdentifier;

use super::Sources;
use crate::cli::ResolveArgs;

pub async fn handle(args: ResolveArgs, sources: &Sources, config: &Config) -> Result<()> {
    let mut id = ResourceIdentifier::new();
    if let Some(api_version) = args.api_version {
        id = id.with_api_version(api_version);
    }
    if let Some(kind) = args.kind {
        id = id.with_kind(kind);
    }
    if let Some(resource) = args.resource {
        id = id.with_resource(resource);
    }
    if let Some(group) = args.group {
        id = id.with_group(group);
    }

    let inspector = sources.inspector(config)?;
    let resolved = inspector.resolve(&id, args.exact).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        let scope = if resolved.namespaced {
            "namespaced"
        } else {
            "cluster-scoped"
        };
        println!("{} ({})", resolved.gvr, scope);
    }

    Ok(())
}
