//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write as _;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::deploy::{DeploymentSummary, DeviceOutcome};
use crate::models::{ConfigPlan, Device, JobResult, JobStatus, LogLevel, PlanSet, StatusRegistry};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Result of one secrets check.
#[derive(Debug, Clone, Serialize)]
pub struct SecretCheck {
    /// Repository or device name.
    pub subject: String,
    /// What was resolved (token, credentials).
    pub kind: String,
    /// Whether a value was found.
    pub resolved: bool,
    /// Error detail, if resolution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Plan row for table display.
#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Type")]
    plan_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Change control")]
    change_control: String,
    #[tabled(rename = "Lines")]
    lines: usize,
}

/// Device outcome row for table display.
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Plans")]
    plans: usize,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Payload")]
    digest: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Job row for table display.
#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Entries")]
    entries: usize,
}

/// Secrets check row for table display.
#[derive(Tabled)]
struct SecretRow {
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Result")]
    result: String,
}

#[derive(Serialize)]
struct PlanJson<'a> {
    #[serde(flatten)]
    plan: &'a ConfigPlan,
    device_name: &'a str,
    status_name: &'a str,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Writes formatted output to stdout.
    pub fn emit(output: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", output.trim_end());
    }

    /// Formats a list of plans.
    #[must_use]
    pub fn format_plans(&self, plans: &PlanSet, devices: &[Device], statuses: &StatusRegistry) -> String {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<PlanJson<'_>> = plans
                    .iter()
                    .map(|plan| PlanJson {
                        plan,
                        device_name: device_name(devices, plan),
                        status_name: statuses.name_of(plan.status).unwrap_or("unknown"),
                    })
                    .collect();
                serde_json::to_string_pretty(&rows).unwrap_or_default()
            }
            OutputFormat::Text => {
                if plans.is_empty() {
                    return String::from("No config plans found.\n");
                }
                let rows: Vec<PlanRow> = plans
                    .iter()
                    .map(|plan| PlanRow {
                        id: plan.id.to_string(),
                        device: device_name(devices, plan).to_string(),
                        plan_type: plan.plan_type.to_string(),
                        status: Self::format_status_name(statuses.name_of(plan.status).unwrap_or("unknown")),
                        change_control: plan.change_control_id.clone().unwrap_or_default(),
                        lines: plan.config_set.lines().count(),
                    })
                    .collect();
                format!("{}\n\n{} plan(s)\n", Table::new(rows), plans.len())
            }
        }
    }

    /// Formats one plan with its config set.
    #[must_use]
    pub fn format_plan(&self, plan: &ConfigPlan, device: &str, status: &str) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&PlanJson {
                plan,
                device_name: device,
                status_name: status,
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "\nConfig plan {}", plan.id);
                let _ = writeln!(output, "   Device: {device}");
                let _ = writeln!(output, "   Type: {}", plan.plan_type);
                let _ = writeln!(output, "   Status: {}", Self::format_status_name(status));
                let _ = writeln!(output, "   Created: {}", plan.created.format("%Y-%m-%d %H:%M"));
                if let Some(id) = &plan.change_control_id {
                    let url = plan.change_control_url.as_deref().unwrap_or("");
                    let _ = writeln!(output, "   Change control: {id} {url}");
                }
                if !plan.features.is_empty() {
                    let _ = writeln!(output, "   Features: {}", plan.features.join(", "));
                }
                if let Some(job) = plan.deploy_result {
                    let _ = writeln!(output, "   Deploy result: {job}");
                }
                let _ = writeln!(output, "\n{}", plan.config_set);
                output
            }
        }
    }

    /// Formats a deployment summary.
    #[must_use]
    pub fn format_summary(&self, summary: &DeploymentSummary) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "\nDeployment {}\n", summary.job_id);

                if !summary.devices.is_empty() {
                    let rows: Vec<OutcomeRow> = summary
                        .devices
                        .iter()
                        .map(|d| OutcomeRow {
                            device: d.device.clone(),
                            plans: d.plans,
                            outcome: Self::format_outcome(d.outcome),
                            digest: d.payload_digest[..12.min(d.payload_digest.len())].to_string(),
                            detail: Self::truncate(d.error.as_deref().unwrap_or(""), 50),
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                let marker = if summary.all_successful() {
                    "✓".green()
                } else {
                    "✗".red()
                };
                let _ = writeln!(output, "\n{marker} {summary}");
                output
            }
        }
    }

    /// Formats a list of job results.
    #[must_use]
    pub fn format_jobs(&self, jobs: &[JobResult]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(jobs).unwrap_or_default(),
            OutputFormat::Text => {
                if jobs.is_empty() {
                    return String::from("No job results found.\n");
                }
                let rows: Vec<JobRow> = jobs
                    .iter()
                    .map(|j| JobRow {
                        id: j.id.to_string(),
                        name: j.name.clone(),
                        status: Self::format_job_status(j.status),
                        created: j.created.format("%Y-%m-%d %H:%M:%S").to_string(),
                        entries: j.log.len(),
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats one job result and its log.
    #[must_use]
    pub fn format_job(&self, job: &JobResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(job).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "\nJob {} ({})", job.id, job.name);
                let _ = writeln!(output, "   Status: {}", Self::format_job_status(job.status));
                let _ = writeln!(output, "   Created: {}", job.created);
                if let Some(completed) = job.completed {
                    let _ = writeln!(output, "   Completed: {completed}");
                }
                output.push('\n');
                for entry in &job.log {
                    let _ = writeln!(
                        output,
                        "{} {:<8} {:<16} {}",
                        entry.timestamp.format("%H:%M:%S%.3f"),
                        Self::format_level(entry.level),
                        entry.subject.as_deref().unwrap_or("-"),
                        entry.message
                    );
                }
                output
            }
        }
    }

    /// Formats a settings validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::json!({
                "valid": result.is_valid(),
                "errors": result
                    .errors
                    .iter()
                    .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
                    .collect::<Vec<_>>(),
                "warnings": result.warnings,
            })
            .to_string(),
            OutputFormat::Text => {
                let mut output = String::new();
                if result.is_valid() {
                    let _ = writeln!(output, "{} Settings are valid.", "✓".green());
                } else {
                    let _ = writeln!(output, "{} {} error(s):", "✗".red(), result.error_count());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {}: {}", error.field, error.message);
                    }
                }
                if show_warnings && !result.warnings.is_empty() {
                    let _ = writeln!(output, "\n{} Warnings:", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats secrets check results.
    #[must_use]
    pub fn format_secret_checks(&self, checks: &[SecretCheck]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(checks).unwrap_or_default(),
            OutputFormat::Text => {
                if checks.is_empty() {
                    return String::from("Nothing to check.\n");
                }
                let rows: Vec<SecretRow> = checks
                    .iter()
                    .map(|c| SecretRow {
                        subject: c.subject.clone(),
                        kind: c.kind.clone(),
                        result: match (&c.error, c.resolved) {
                            (Some(err), _) => format!("{} {}", "error".red(), Self::truncate(err, 50)),
                            (None, true) => "resolved".green().to_string(),
                            (None, false) => "missing".yellow().to_string(),
                        },
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    fn format_status_name(name: &str) -> String {
        match name {
            crate::models::COMPLETED | crate::models::APPROVED => name.green().to_string(),
            crate::models::FAILED => name.red().to_string(),
            crate::models::IN_PROGRESS => name.yellow().to_string(),
            _ => name.dimmed().to_string(),
        }
    }

    fn format_outcome(outcome: DeviceOutcome) -> String {
        match outcome {
            DeviceOutcome::Deployed => outcome.as_str().green().to_string(),
            DeviceOutcome::NothingToDeploy | DeviceOutcome::NotCommitted => outcome.as_str().dimmed().to_string(),
            DeviceOutcome::Unexpected => outcome.as_str().yellow().to_string(),
            DeviceOutcome::Reverted | DeviceOutcome::TransportFailed | DeviceOutcome::Error => {
                outcome.as_str().red().to_string()
            }
        }
    }

    fn format_job_status(status: JobStatus) -> String {
        match status {
            JobStatus::Completed => status.to_string().green().to_string(),
            JobStatus::Failed | JobStatus::Errored => status.to_string().red().to_string(),
            JobStatus::Pending | JobStatus::Running => status.to_string().yellow().to_string(),
        }
    }

    fn format_level(level: LogLevel) -> String {
        let name = level.as_str();
        match level {
            LogLevel::Debug => name.dimmed().to_string(),
            LogLevel::Info => name.to_string(),
            LogLevel::Success => name.green().to_string(),
            LogLevel::Warning => name.yellow().to_string(),
            LogLevel::Failure | LogLevel::Error => name.red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

fn device_name<'a>(devices: &'a [Device], plan: &ConfigPlan) -> &'a str {
    devices
        .iter()
        .find(|d| d.id == plan.device)
        .map_or("unknown", |d| d.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{payload_digest, DeviceReport};
    use crate::models::PlanType;
    use uuid::Uuid;

    #[test]
    fn test_plans_json_carries_names() {
        let device = Device::new("edge-1");
        let mut statuses = StatusRegistry::empty();
        let status = statuses.ensure("Approved");
        let plans = PlanSet::new(vec![ConfigPlan::new(device.id, PlanType::Manual, "hostname edge-1", &status)]);

        let output = OutputFormatter::new(OutputFormat::Json).format_plans(&plans, &[device], &statuses);
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value[0]["device_name"], "edge-1");
        assert_eq!(value[0]["status_name"], "Approved");
        assert_eq!(value[0]["config_set"], "hostname edge-1");
    }

    #[test]
    fn test_summary_text_mentions_counts() {
        let summary = DeploymentSummary {
            job_id: Uuid::new_v4(),
            commit: false,
            devices: vec![DeviceReport {
                device: String::from("edge-1"),
                device_id: Uuid::new_v4(),
                plans: 2,
                outcome: DeviceOutcome::NotCommitted,
                payload_digest: payload_digest("line1\nline2"),
                result: None,
                error: None,
            }],
        };
        let output = OutputFormatter::new(OutputFormat::Text).format_summary(&summary);
        assert!(output.contains("edge-1"));
        assert!(output.contains("1 device(s): 1 succeeded, 0 failed (commit disabled)"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("ééééééééééé", 6), "ééé...");
    }
}
