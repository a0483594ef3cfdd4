//! HTTP client for the ingestion service

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::Ingestion;
use crate::proto::{DeleteQuery, DeleteResponse, EmbedRequest};
use crate::{Result, SyncError};

/// Talks to `POST /embed` and `DELETE /embed` on the ingestion service.
#[derive(Clone)]
pub struct HttpIngestionClient {
    client: reqwest::Client,
    url: String,
}

impl HttpIngestionClient {
    /// `url` is the full embed endpoint, e.g. `http://server:8000/embed`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport_with_source("build client", e))?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn check(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::transport_status(operation, status.as_u16(), body))
    }
}

#[async_trait]
impl Ingestion for HttpIngestionClient {
    async fn embed(&self, request: EmbedRequest) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SyncError::transport_with_source("embed", e))?;
        Self::check("embed", response).await?;

        debug!(file = %request.metadata.file, line = request.metadata.line, "Chunk stored");
        Ok(())
    }

    async fn delete_file(&self, project: &str, file: &str) -> Result<u64> {
        let query = DeleteQuery { file: file.to_string(), project: Some(project.to_string()) };
        let response = self
            .client
            .delete(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| SyncError::transport_with_source("delete", e))?;
        let response = Self::check("delete", response).await?;

        // Older servers answer with an empty or count-less body
        let removed = match response.json::<DeleteResponse>().await {
            Ok(body) => body.removed,
            Err(_) => 0,
        };
        debug!(file, removed, "File entries deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use ragsync_domain::ChunkMetadata;
    use serde_json::json;

    use super::*;

    fn fixture_request() -> EmbedRequest {
        EmbedRequest {
            text: "line1\nline2".to_string(),
            metadata: ChunkMetadata { project: "proj".to_string(), file: "foo.py".to_string(), line: 1 },
        }
    }

    async fn client(server: &mockito::Server) -> HttpIngestionClient {
        HttpIngestionClient::new(format!("{}/embed", server.url()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_embed_posts_chunk() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .match_body(Matcher::Json(json!({
                "text": "line1\nline2",
                "metadata": {"project": "proj", "file": "foo.py", "line": 1}
            })))
            .with_status(200)
            .with_body(r#"{"status":"stored"}"#)
            .create_async()
            .await;

        let actual = client(&server).await.embed(fixture_request()).await;

        assert!(actual.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_non_success_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embed")
            .with_status(400)
            .with_body(r#"{"detail":"Text cannot be empty."}"#)
            .create_async()
            .await;

        let actual = client(&server).await.embed(fixture_request()).await;

        assert!(matches!(actual, Err(SyncError::Transport { status: Some(400), .. })));
    }

    #[tokio::test]
    async fn test_delete_sends_file_and_project() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/embed")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("file".into(), "src/foo bar.py".into()),
                Matcher::UrlEncoded("project".into(), "proj".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"deleted","removed":3}"#)
            .create_async()
            .await;

        let actual = client(&server).await.delete_file("proj", "src/foo bar.py").await.unwrap();

        assert_eq!(actual, 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let mut server = mockito::Server::new_async().await;
        server.mock("DELETE", "/embed").match_query(Matcher::Any).with_status(200).create_async().await;

        let actual = client(&server).await.delete_file("proj", "a.py").await.unwrap();

        assert_eq!(actual, 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let fixture = HttpIngestionClient::new("http://127.0.0.1:9/embed", Duration::from_millis(500))
            .unwrap();

        let actual = fixture.delete_file("proj", "a.py").await;

        assert!(matches!(actual, Err(SyncError::Transport { status: None, .. })));
    }
}
