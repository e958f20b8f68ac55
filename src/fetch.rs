// src/fetch.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};
use url::Url;

use crate::dataset::DatasetDocument;

/// HTTP client with the whole-request timeout applied.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .gzip(true)
        .build()
        .context("building HTTP client")
}

/// Decode a `rows.json` body. Missing `meta.view.columns` or `data` is an error.
pub fn parse_dataset(body: &[u8]) -> Result<DatasetDocument> {
    serde_json::from_slice(body).context("decoding dataset document")
}

/// GET the dataset export and decode it. Any transport error, timeout or
/// non-2xx status fails the run.
#[instrument(level = "info", skip(client, url), fields(url = %url))]
pub async fn fetch_dataset(client: &Client, url: &Url) -> Result<DatasetDocument> {
    let start = Instant::now();
    let body = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("Reading body from {}", url))?;
    debug!(bytes = body.len(), elapsed = ?start.elapsed(), "downloaded");

    let doc = parse_dataset(&body).with_context(|| format!("parsing {}", url))?;
    info!(
        columns = doc.columns().len(),
        rows = doc.data.len(),
        "dataset fetched"
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    const DOC: &str = r#"{
        "meta": {"view": {"columns": [
            {"fieldName": ":sid", "flags": ["hidden"]},
            {"fieldName": "dol_vehicle_id"},
            {"fieldName": "make"}
        ]}},
        "data": [["row-1", "1001", "TESLA"], ["row-2", "1002", "NISSAN"]]
    }"#;

    /// Serve one canned response on a loopback port, optionally after a delay.
    async fn serve_once(status: &'static str, body: &'static str, delay: Duration) -> Result<Url> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let resp = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        Ok(Url::parse(&format!("http://{}/rows.json", addr))?)
    }

    #[test]
    fn parses_columns_and_rows() -> Result<()> {
        let doc = parse_dataset(DOC.as_bytes())?;
        assert_eq!(doc.columns().len(), 3);
        assert_eq!(doc.data.len(), 2);
        assert_eq!(doc.data[1][2], "NISSAN");
        Ok(())
    }

    #[test]
    fn missing_metadata_is_fatal() {
        assert!(parse_dataset(br#"{"data": []}"#).is_err());
        assert!(parse_dataset(br#"{"meta": {"view": {}}, "data": []}"#).is_err());
        assert!(parse_dataset(br#"{"meta": {"view": {"columns": []}}}"#).is_err());
        assert!(parse_dataset(b"not json").is_err());
    }

    #[tokio::test]
    async fn fetches_over_http() -> Result<()> {
        let url = serve_once("200 OK", DOC, Duration::ZERO).await?;
        let client = build_client(Duration::from_secs(5))?;
        let doc = fetch_dataset(&client, &url).await?;
        assert_eq!(doc.data.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_fatal() -> Result<()> {
        let url = serve_once("503 Service Unavailable", "{}", Duration::ZERO).await?;
        let client = build_client(Duration::from_secs(5))?;
        let err = fetch_dataset(&client, &url).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Non-success status"));
        Ok(())
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() -> Result<()> {
        let url = serve_once("200 OK", DOC, Duration::from_secs(3)).await?;
        let client = build_client(Duration::from_millis(200))?;
        assert!(fetch_dataset(&client, &url).await.is_err());
        Ok(())
    }
}
