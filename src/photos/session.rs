use futures_util::StreamExt;
use serde_json::Value;

use super::{ByteStream, ServiceError};

/// Minimal async session used by the photos service.
///
/// Credentials (cookies, tokens) are baked into the session by whoever
/// builds it; this layer only moves requests and bytes.
#[async_trait::async_trait]
pub trait PhotosSession: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<Value, ServiceError>;

    /// Open a download URL as a byte stream.
    async fn stream(&self, url: &str) -> Result<ByteStream, ServiceError>;
}

/// Turn a CloudKit error envelope into an `ApiResponse` error.
fn check_server_error(json: Value) -> Result<Value, ServiceError> {
    if let Some(code) = json["serverErrorCode"].as_str() {
        let reason = json["reason"].as_str().unwrap_or("unknown reason");
        return Err(ServiceError::api(reason, code));
    }
    Ok(json)
}

#[async_trait::async_trait]
impl PhotosSession for reqwest::Client {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<Value, ServiceError> {
        let mut builder = reqwest::Client::post(self, url).body(body.to_owned());
        for &(k, v) in headers {
            builder = builder.header(k, v);
        }
        let resp = builder.send().await.map_err(ServiceError::from_send)?;
        let status = resp.status();
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(ServiceError::api(reason, status.as_str()));
        }
        let json: Value = resp.json().await?;
        check_server_error(json)
    }

    async fn stream(&self, url: &str) -> Result<ByteStream, ServiceError> {
        let resp = reqwest::Client::get(self, url)
            .send()
            .await
            .map_err(ServiceError::from_send)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::api(
                status.canonical_reason().unwrap_or("download failed"),
                status.as_str(),
            ));
        }
        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(ServiceError::from))
            .boxed())
    }
}
