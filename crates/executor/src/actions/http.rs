//! HTTP request capability

use std::time::Duration;

use serde_json::Value;

use crate::{opt_str_arg, str_arg, ExecError};

const BODY_CAP: usize = 10_000;
const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "PATCH"];

pub(crate) async fn request(args: &Value, timeout: Duration) -> Result<String, ExecError> {
    let url = str_arg(args, "url")?;
    let method = opt_str_arg(args, "method")
        .unwrap_or_else(|| "GET".to_string())
        .to_uppercase();

    if !ALLOWED_METHODS.contains(&method.as_str()) {
        return Err(ExecError::InvalidArgs(format!(
            "method '{}' is not supported",
            method
        )));
    }

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ExecError::Failed(format!("http client error: {}", e)))?;

    let parsed_method = reqwest::Method::from_bytes(method.as_bytes())
        .map_err(|e| ExecError::InvalidArgs(format!("invalid method: {}", e)))?;

    let mut request = client.request(parsed_method, &url);
    if let Some(body) = opt_str_arg(args, "body") {
        request = request.body(body);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ExecError::Timeout(format!("request to '{}' timed out", url))
        } else {
            ExecError::Failed(format!("request failed: {}", e))
        }
    })?;

    let status = response.status();
    let mut body = response
        .text()
        .await
        .map_err(|e| ExecError::Failed(format!("cannot read response body: {}", e)))?;

    crate::cap_output(&mut body, BODY_CAP, "\n... (body truncated)");

    Ok(format!("HTTP {}\n{}", status.as_u16(), body))
}
