use std::path::PathBuf;

use anyhow::{Context, Result};
use probe_config::Config;
use probe_security::RedactionInfo;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use super::redactor;

pub async fn handle(file: Option<PathBuf>, stats: bool, config: &Config) -> Result<()> {
    let input = match &file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let (output, infos) = redact_input(&input, config);
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }

    if stats {
        print_stats(&infos);
    }

    Ok(())
}

/// JSON input is redacted as a tree; anything else as one string
fn redact_input(input: &str, config: &Config) -> (String, Vec<RedactionInfo>) {
    let redactor = redactor(config);
    match serde_json::from_str::<Value>(input) {
        Ok(value) => {
            let (redacted, infos) = redactor.redact_with_report(&value);
            let output =
                serde_json::to_string_pretty(&redacted).unwrap_or_else(|_| redacted.to_string());
            (output, infos)
        }
        Err(_) => {
            let (redacted, infos) = redactor.redact_with_report(&Value::String(input.to_string()));
            let output = match redacted {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (output, infos)
        }
    }
}

fn print_stats(infos: &[RedactionInfo]) {
    if infos.is_empty() {
        eprintln!("No redactions.");
        return;
    }

    let total: usize = infos.iter().map(|i| i.count).sum();
    eprintln!("Redactions ({}):", total);
    for info in infos {
        eprintln!("  {:<20} {}", info.redaction_type, info.count);
    }
}
