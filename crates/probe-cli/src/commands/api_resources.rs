use anyhow::Result;
use probe_config::Config;
use probe_core::{ApiResourceList, Discovery};

use super::Sources;

pub async fn handle(json: bool, sources: &Sources, config: &Config) -> Result<()> {
    if json {
        let inspector = sources.inspector(config)?;
        let value = inspector.api_resources().await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let snapshot = sources.discovery(config)?.current().await?;
    let preferred = snapshot.preferred_resources()?;

    print!("{}", render_table(&preferred.lists));
    for (group_version, reason) in &preferred.failed_groups {
        eprintln!("warning: {group_version} unavailable: {reason}");
    }

    Ok(())
}

fn render_table(lists: &[ApiResourceList]) -> String {
    let mut rows = vec![[
        "NAME".to_string(),
        "SHORTNAMES".to_string(),
        "APIVERSION".to_string(),
        "NAMESPACED".to_string(),
        "KIND".to_string(),
    ]];
    for list in lists {
        for resource in list.resources.iter().filter(|r| !r.is_subresource()) {
            rows.push([
                resource.name.clone(),
                resource.short_names.join(","),
                list.group_version.clone(),
                resource.namespaced.to_string(),
                resource.kind.clone(),
            ]);
        }
    }

    let mut widths = [0usize; 5];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("   ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_core::ApiResource;

    #[test]
    fn test_render_table() {
        let lists = vec![ApiResourceList::new(
            "v1",
            vec![
                ApiResource::new("pods", "Pod", true).with_short_names(&["po"]),
                ApiResource::new("pods/log", "Pod", true),
                ApiResource::new("nodes", "Node", false),
            ],
        )];

        let table = render_table(&lists);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("pods "));
        assert!(lines[1].contains("po"));
        assert!(lines[2].ends_with("Node"));
        assert!(!table.contains("pods/log"));
    }
}
