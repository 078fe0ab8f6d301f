//! Service status command

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_info, print_json, print_table, OutputFormat};
use service_lib::{ComponentStatus, HealthResponse};

#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    url: &'a str,
    message: String,
    health: HealthResponse,
}

fn status_name(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "healthy",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "unhealthy",
    }
}

/// Show the service greeting and its health report
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let welcome = client
        .welcome()
        .await
        .context("Failed to reach the prediction service")?;
    let health = client
        .health()
        .await
        .context("Failed to fetch service health")?;

    match format {
        OutputFormat::Json => print_json(&StatusReport {
            url: client.base_url().as_str(),
            message: welcome.message,
            health,
        })?,
        OutputFormat::Table => {
            println!("{}", "Service Status".bold());
            println!("{}", "=".repeat(50));
            println!("URL:       {}", client.base_url().as_str().cyan());
            println!("Message:   {}", welcome.message);
            println!("Status:    {}", color_status(status_name(health.status)));
            match &health.artifact_version {
                Some(version) => println!("Artifact:  {}", version),
                None => print_info("No artifact version reported"),
            }
            println!();

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(status_name(component.status)),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    Ok(())
}
