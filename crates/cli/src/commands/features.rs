//! Offline validation and feature derivation

use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::predict::read_payload;
use crate::output::{print_field_errors, print_json, print_table, print_warning, OutputFormat};
use service_lib::features::{derive_features, FeatureValue};
use service_lib::schema::PredictionRequest;

#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn display_value(value: FeatureValue) -> String {
    match value {
        FeatureValue::Numeric(v) if v.is_finite() => format!("{}", v),
        FeatureValue::Numeric(v) => v.to_string().red().to_string(),
        FeatureValue::Categorical(Some(category)) => category.to_string(),
        FeatureValue::Categorical(None) => "(unassigned)".dimmed().to_string(),
    }
}

/// Validate a request file and print the features the service would compute
pub fn show_features(file: &Path, format: OutputFormat) -> Result<()> {
    let payload = read_payload(file)?;

    let request = match PredictionRequest::from_slice(&payload) {
        Ok(request) => request,
        Err(e) => {
            match format {
                OutputFormat::Json => print_json(&e.errors)?,
                OutputFormat::Table => print_field_errors(&e.errors),
            }
            bail!("{}", e);
        }
    };

    let features = derive_features(&request)?;

    match format {
        OutputFormat::Json => print_json(&features)?,
        OutputFormat::Table => {
            println!("{}", "Derived Features".bold());
            println!("{}", "=".repeat(40));
            let rows: Vec<FeatureRow> = features
                .columns()
                .into_iter()
                .map(|(column, value)| FeatureRow {
                    column: column.to_string(),
                    value: display_value(value),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    let non_finite = features.non_finite_columns();
    if !non_finite.is_empty() {
        print_warning(&format!(
            "{} not finite; the service will reject this request",
            non_finite.join(", ")
        ));
    }

    Ok(())
}
