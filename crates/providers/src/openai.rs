use crate::{CompletionResponse, EmbedResponse, EmbeddingProvider, LlmProvider, ProviderError};
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    cfg: Arc<OpenAiConfig>,
}

impl OpenAiProvider {
    pub fn new(cfg: OpenAiConfig) -> Result<Self, ProviderError> {
        if cfg.api_key.trim().is_empty() {
            return Err(ProviderError::RequestFailed("missing OpenAI API key".into()));
        }
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.cfg.base_url.trim_end_matches('/'), path)
    }
}

async fn check_status(resp: Response) -> Result<Response, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        #[derive(serde::Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        if texts.is_empty() {
            return Ok(EmbedResponse {
                vectors: Vec::new(),
            });
        }

        let body = EmbedRequest {
            model: &self.cfg.embedding_model,
            input: texts,
        };

        let resp = self
            .client
            .post(self.endpoint("embeddings"))
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let resp = check_status(resp).await?;

        let mut parsed: EmbeddingApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parsed.data.sort_by_key(|d| d.index);
        if parsed.data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "{} embeddings returned for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(EmbedResponse {
            vectors: parsed.data.into_iter().map(|d| d.embedding).collect(),
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, ProviderError> {
        #[derive(serde::Serialize)]
        struct ChatMessage<'a> {
            role: &'static str,
            content: &'a str,
        }
        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessageResp,
        }
        #[derive(Deserialize)]
        struct ChatMessageResp {
            #[serde(default)]
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct ChatApiResponse {
            choices: Vec<Choice>,
        }

        let body = ChatRequest {
            model: &self.cfg.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let resp = check_status(resp).await?;

        let parsed: ChatApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in completion".into()))?
            .message
            .content
            .unwrap_or_default();

        Ok(CompletionResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(base_url: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".into(),
            base_url: base_url.into(),
            embedding_model: "text-embedding-ada-002".into(),
            chat_model: "gpt-3.5-turbo".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let provider = OpenAiProvider::new(cfg("https://api.openai.com/")).unwrap();
        assert_eq!(
            provider.endpoint("embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn blank_key_is_rejected() {
        let mut c = cfg("https://api.openai.com");
        c.api_key = "  ".into();
        assert!(OpenAiProvider::new(c).is_err());
    }

    #[tokio::test]
    async fn empty_batch_skips_request() {
        // Unroutable base URL: any real request would fail.
        let provider = OpenAiProvider::new(cfg("http://127.0.0.1:9")).unwrap();
        let resp = provider.embed(&[]).await.unwrap();
        assert!(resp.vectors.is_empty());
    }
}
