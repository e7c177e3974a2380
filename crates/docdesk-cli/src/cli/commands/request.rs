//! Raw authenticated request.

use anyhow::{Context, Result};
use docdesk_core::api::ApiClient;
use reqwest::Method;
use serde_json::Value;

pub async fn run(client: &ApiClient, method: &str, path: &str, data: Option<&str>) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method: {method}"))?;

    let mut request = client.request(method, path)?;
    if let Some(data) = data {
        let body: Value = serde_json::from_str(data).context("--data must be valid JSON")?;
        request = request.json(&body);
    }

    let response = client.send(request).await?;
    let status = response.status();
    let text = response.text().await.context("read response body")?;
    tracing::debug!(status = status.as_u16(), "request finished");

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("{status}"),
        Err(_) => println!("{text}"),
    }
    Ok(())
}
