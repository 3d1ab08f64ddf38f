/// 文章生成サービス（writer）へのHTTPクライアント。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::pipeline::{ContentGenerator, GenerationRequest};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    content: String,
}

/// writerクライアントの設定。
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub service_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WriterClient {
    client: Client,
    base_url: Url,
    service_token: Option<String>,
}

impl WriterClient {
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合。
    pub fn new(config: WriterConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build writer HTTP client")?;

        // join() が最後のパス要素を置き換えないよう末尾スラッシュを揃える
        let mut raw = config.base_url;
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw).context("invalid writer base URL")?;

        Ok(Self {
            client,
            base_url,
            service_token: config.service_token,
        })
    }
}

#[async_trait]
impl ContentGenerator for WriterClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = self
            .base_url
            .join("v1/generate")
            .context("failed to build writer generate URL")?;
        debug!(theme = %request.theme, topic = %request.topic, "calling writer");

        let mut builder = self.client.post(url).json(request);
        if let Some(ref token) = self.service_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.context("writer generate request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("writer returned error status {status}: {body}");
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("failed to deserialize writer response")?;
        debug!(bytes = parsed.content.len(), "writer responded");
        Ok(parsed.content)
    }

    /// writerの `/health` を叩く。
    async fn health_check(&self) -> Result<()> {
        let url = self
            .base_url
            .join("health")
            .context("failed to build writer health URL")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("writer health request failed")?;
        response
            .error_for_status()
            .context("writer health endpoint returned error status")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Theme;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> WriterClient {
        WriterClient::new(WriterConfig {
            base_url: server.uri(),
            connect_timeout: Duration::from_secs(1),
            total_timeout: Duration::from_secs(5),
            service_token: token.map(ToString::to_string),
        })
        .expect("client builds")
    }

    #[tokio::test]
    async fn generate_posts_request_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "topic": "Layer 2 rollups",
                "theme": "blockchain"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"content": "# Rollups\n\nBody"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let content = client
            .generate(&GenerationRequest::new("Layer 2 rollups", Theme::Blockchain))
            .await
            .expect("generate succeeds");
        assert_eq!(content, "# Rollups\n\nBody");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .generate(&GenerationRequest::new("RAG", Theme::Genai))
            .await
            .expect_err("503 is an error");
        let message = format!("{err:#}");
        assert!(message.contains("503"), "{message}");
        assert!(message.contains("model loading"), "{message}");
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": 1})))
            .mount(&server)
            .await;

        let result = client_for(&server, None)
            .generate(&GenerationRequest::new("RAG", Theme::Genai))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn base_path_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/writer/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WriterClient::new(WriterConfig {
            base_url: format!("{}/writer", server.uri()),
            connect_timeout: Duration::from_secs(1),
            total_timeout: Duration::from_secs(5),
            service_token: None,
        })
        .expect("client builds");
        client.health_check().await.expect("healthy");
    }
}
