//! Cloud Log Retrieval
//!
//! Reads recent Cloud Logging entries through the gcloud CLI with the
//! session's service-account key, then summarizes them: severity counts,
//! resource distribution, and the raw payloads. The summary keeps the
//! reasoning client from having to page through thousands of repeated lines.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use agent_core::error::Result;
use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolContext, ToolResult, ToolSchema};

use crate::args::{opt_u64, require_str};
use crate::gcloud::{activate_service_account, credential_env, session_project_id};
use crate::process::run_command;

const MAX_ENTRIES: u64 = 100;
const DEFAULT_FRESHNESS_HOURS: u64 = 1;

#[derive(Debug, Serialize)]
struct LogAnalysis {
    period: String,
    total_entries: usize,
    severity_distribution: BTreeMap<String, u64>,
    resources_distribution: BTreeMap<String, f64>,
    raw_logs: String,
}

fn entry_str<'a>(entry: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(|v| v.as_str())
}

fn payload_text(entry: &serde_json::Value) -> String {
    if let Some(text) = entry_str(entry, "textPayload") {
        return text.to_string();
    }
    if let Some(json) = entry.get("jsonPayload") {
        return json.to_string();
    }
    String::new()
}

fn analyze(mut entries: Vec<serde_json::Value>) -> LogAnalysis {
    // RFC 3339 timestamps sort lexically; oldest first for the period note.
    entries.sort_by(|a, b| {
        entry_str(a, "timestamp")
            .unwrap_or_default()
            .cmp(entry_str(b, "timestamp").unwrap_or_default())
    });

    let total = entries.len();
    let period = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) if total > 1 => format!(
            "Logs from {} to {}",
            entry_str(first, "timestamp").unwrap_or("unknown"),
            entry_str(last, "timestamp").unwrap_or("unknown"),
        ),
        (Some(only), _) => format!(
            "Single log entry at {}",
            entry_str(only, "timestamp").unwrap_or("unknown")
        ),
        _ => "No logs found for the specified period".to_string(),
    };

    let mut severity_distribution = BTreeMap::new();
    let mut resource_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut raw_lines = Vec::with_capacity(total);
    for entry in &entries {
        let severity = entry_str(entry, "severity").unwrap_or("DEFAULT").to_string();
        *severity_distribution.entry(severity).or_insert(0) += 1;

        let resource_key = entry
            .get("resource")
            .map(ToString::to_string)
            .unwrap_or_default();
        *resource_counts.entry(resource_key).or_insert(0) += 1;

        raw_lines.push(payload_text(entry));
    }

    let resources_distribution = resource_counts
        .into_iter()
        .map(|(k, count)| {
            let pct = (count as f64 / total as f64 * 100.0 * 100.0).round() / 100.0;
            (k, pct)
        })
        .collect();

    LogAnalysis {
        period,
        total_entries: total,
        severity_distribution,
        resources_distribution,
        raw_logs: raw_lines.join("\n"),
    }
}

pub struct RetrieveLogsTool;

#[async_trait]
impl Tool for RetrieveLogsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "retrieve_logs".to_string(),
            description: "Retrieve and analyze recent Cloud Logging entries for the session's \
                          project. Returns the covered period, severity distribution, resource \
                          distribution, and the raw log payloads."
                .to_string(),
            parameters: vec![
                ParameterSchema {
                    name: "filter".to_string(),
                    param_type: "string".to_string(),
                    description: "Cloud Logging filter, e.g. 'resource.type=\"gce_instance\" severity>=ERROR'"
                        .to_string(),
                    required: true,
                },
                ParameterSchema {
                    name: "hours".to_string(),
                    param_type: "integer".to_string(),
                    description: "How many hours back to read (default 1)".to_string(),
                    required: false,
                },
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let filter = require_str(call, "filter")?;
        if filter.trim().is_empty() {
            return Ok(ToolResult::failure(
                "retrieve_logs",
                "Filter string cannot be empty",
            ));
        }
        let hours = opt_u64(call, "hours").unwrap_or(DEFAULT_FRESHNESS_HOURS);

        let project_id = session_project_id(ctx).await?;
        activate_service_account(ctx).await?;

        let freshness = format!("--freshness={}h", hours);
        let limit = format!("--limit={}", MAX_ENTRIES);
        let project = format!("--project={}", project_id);
        tracing::info!(%filter, hours, "retrieving cloud logs");
        let output = run_command(
            "gcloud",
            &["logging", "read", filter, &freshness, &limit, "--format=json", &project],
            &ctx.session_dir(),
            &credential_env(ctx),
            ctx.command_timeout,
        )
        .await?;
        if !output.success {
            return Ok(ToolResult::failure(
                "retrieve_logs",
                format!("Failed to retrieve logs: {}", output.stderr),
            ));
        }

        let entries: Vec<serde_json::Value> = serde_json::from_str(&output.stdout)?;
        let analysis = analyze(entries);
        tracing::info!(entries = analysis.total_entries, "retrieved log entries");
        Ok(ToolResult::success(
            "retrieve_logs",
            serde_json::to_string_pretty(&analysis)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entries() -> Vec<serde_json::Value> {
        vec![
            json!({
                "timestamp": "2026-08-28T10:05:00Z",
                "severity": "ERROR",
                "textPayload": "connection refused",
                "resource": {"type": "gce_instance"},
            }),
            json!({
                "timestamp": "2026-08-28T10:00:00Z",
                "severity": "ERROR",
                "textPayload": "connection refused",
                "resource": {"type": "gce_instance"},
            }),
            json!({
                "timestamp": "2026-08-28T10:02:00Z",
                "severity": "INFO",
                "jsonPayload": {"message": "restarting"},
                "resource": {"type": "cloud_run_revision"},
            }),
        ]
    }

    #[test]
    fn test_analysis_counts_severities() {
        let analysis = analyze(sample_entries());
        assert_eq!(analysis.total_entries, 3);
        assert_eq!(analysis.severity_distribution["ERROR"], 2);
        assert_eq!(analysis.severity_distribution["INFO"], 1);
    }

    #[test]
    fn test_analysis_orders_period_oldest_first() {
        let analysis = analyze(sample_entries());
        assert_eq!(
            analysis.period,
            "Logs from 2026-08-28T10:00:00Z to 2026-08-28T10:05:00Z"
        );
    }

    #[test]
    fn test_analysis_resource_percentages() {
        let analysis = analyze(sample_entries());
        let gce: f64 = analysis
            .resources_distribution
            .iter()
            .find(|(k, _)| k.contains("gce_instance"))
            .map(|(_, v)| *v)
            .unwrap();
        assert!((gce - 66.67).abs() < 0.01);
    }

    #[test]
    fn test_empty_log_set() {
        let analysis = analyze(Vec::new());
        assert_eq!(analysis.total_entries, 0);
        assert_eq!(analysis.period, "No logs found for the specified period");
        assert!(analysis.raw_logs.is_empty());
    }
}
