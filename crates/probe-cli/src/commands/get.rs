use anyhow::Result;
use probe_config::Config;
use probe_core::ResourceIdentifier;

use super::Sources;

pub async fn handle(
    resource: &str,
    name: Option<&str>,
    namespace: Option<&str>,
    selector: Option<&str>,
    sources: &Sources,
    config: &Config,
) -> Result<()> {
    let inspector = sources.inspector(config)?;
    let id = ResourceIdentifier::new().with_resource(resource);

    let result = match name {
        Some(name) => inspector.get(&id, name, namespace).await?,
        None => inspector.list(&id, namespace, selector).await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
