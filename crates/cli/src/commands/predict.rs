//! Remote prediction command

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::client::{ApiClient, ApiError};
use crate::output::{
    color_label, print_error, print_field_errors, print_json, print_success, OutputFormat,
};

/// Read a request payload; `-` reads standard input
pub fn read_payload(file: &Path) -> Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut buffer = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buffer)
            .context("Failed to read request from stdin")?;
        return Ok(buffer);
    }
    std::fs::read(file).with_context(|| format!("Failed to read request file {:?}", file))
}

/// Send a request file to the service and print the predicted label
pub async fn predict(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let payload = read_payload(file)?;
    let request: serde_json::Value =
        serde_json::from_slice(&payload).context("Request file is not valid JSON")?;

    match client.predict(&request).await {
        Ok(response) => match format {
            OutputFormat::Json => print_json(&response)?,
            OutputFormat::Table => {
                print_success(&format!("Prediction: {}", color_label(response.prediction)))
            }
        },
        Err(ApiError::Rejected { status, body }) => {
            match format {
                OutputFormat::Json => print_json(&body)?,
                OutputFormat::Table => {
                    print_error(&body.message);
                    if !body.fields.is_empty() {
                        print_field_errors(&body.fields);
                    }
                }
            }
            bail!("Service rejected the request ({}: {})", status, body.error);
        }
        Err(e) => return Err(e).context("Prediction request failed"),
    }

    Ok(())
}
