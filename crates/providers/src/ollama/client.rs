use crate::ollama::config::OllamaConfig;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use oml_core::api::{ChatRequest, Endpoint, PullRequest};
use oml_core::OmlError;
use reqwest::{header, Client};
use serde::Serialize;
use std::pin::Pin;
use tracing::{error, info, warn};

/// Response body of one request, readable chunk by chunk. Dropping it closes
/// the connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// An open response: its HTTP status and body.
pub struct Reply {
    pub status: u16,
    pub body: ByteStream,
}

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    cfg: OllamaConfig,
}

impl OllamaClient {
    pub fn new(cfg: OllamaConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/x-ndjson"),
        );
        // No idle connections are kept, so every request opens its own.
        let http = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_max_idle_per_host(0)
            .connect_timeout(cfg.connect_timeout)
            .build()?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.cfg
    }

    pub fn config_mut(&mut self) -> &mut OllamaConfig {
        &mut self.cfg
    }

    pub fn host(&self) -> &str {
        self.cfg.host()
    }

    pub fn set_host(&mut self, host: impl AsRef<str>) {
        self.cfg.set_host(host);
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        endpoint.url(self.cfg.host())
    }

    /// POST `payload` as JSON to `endpoint` and hand back the open body.
    ///
    /// Any HTTP status yields a stream: Ollama reports failures such as an
    /// unknown model as an `{"error": ...}` line in the body. Only failing to
    /// get a response at all is an error.
    pub async fn send<T>(&self, endpoint: Endpoint, payload: &T) -> Result<ByteStream, OmlError>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.open(endpoint, payload).await?.body)
    }

    /// [`send`](Self::send), keeping the response status.
    pub async fn open<T>(&self, endpoint: Endpoint, payload: &T) -> Result<Reply, OmlError>
    where
        T: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        info!(target: "providers::ollama", "POST {}", url);
        let resp = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!(target: "providers::ollama", "request to {} failed: {}", url, e);
                map_reqwest_err(e)
            })?;
        let status = resp.status();
        if !status.is_success() {
            warn!(target: "providers::ollama", "{} answered status={}", url, status);
        }
        Ok(Reply {
            status: status.as_u16(),
            body: resp.bytes_stream().boxed(),
        })
    }

    pub async fn chat(&self, req: &ChatRequest) -> Result<ByteStream, OmlError> {
        self.send(Endpoint::Chat, req).await
    }

    pub async fn pull(&self, req: &PullRequest) -> Result<ByteStream, OmlError> {
        self.send(Endpoint::Pull, req).await
    }
}

fn map_reqwest_err(e: reqwest::Error) -> OmlError {
    if e.is_timeout() {
        OmlError::Transport(format!("timed out: {}", e))
    } else if e.is_connect() {
        OmlError::Transport(format!("cannot connect: {}", e))
    } else {
        OmlError::Transport(e.to_string())
    }
}
