// Access to the language model acting as Game Master.
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GatewayError;

pub const MODEL_NAME: &str = "airoboros-m-7b-3.1.2";
// 8-bit weights, the model tag selects the quantized build.
pub const QUANTIZATION: &str = "q8_0";
pub const MAX_NEW_TOKENS: u32 = 200;
pub const TEMPERATURE: f32 = 0.7;

pub const LOADED_MESSAGE: &str = "Model loaded successfully.";

/// Anything able to continue a prompt.
///
/// Implementations return the whole decoded text, prompt included, the way a
/// causal model decodes its full output sequence.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, GatewayError>>;
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    raw: bool,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

// Raw mode answers with the continuation only; put the prompt back in front.
fn decoded_text(prompt: &str, generated: &GenerateResponse) -> String {
    format!("{prompt}{}", generated.response)
}

/// A model served by a local Ollama compatible server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: format!("{MODEL_NAME}:{QUANTIZATION}"),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&self, prompt: Option<&'a str>) -> GenerateRequest<'a> {
        GenerateRequest {
            model: self.model.clone(),
            prompt,
            raw: true,
            stream: false,
            options: GenerateOptions {
                num_predict: MAX_NEW_TOKENS,
                temperature: TEMPERATURE,
            },
        }
    }

    async fn call(&self, prompt: Option<&str>) -> Result<GenerateResponse, GatewayError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&self.request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }
        Ok(response.json::<GenerateResponse>().await?)
    }

    /// Asks the server to bring the model into memory. A generate call without
    /// a prompt only loads the model.
    pub async fn load(&self) -> Result<(), GatewayError> {
        log::info!("Loading model {} from {}", self.model, self.endpoint);
        self.call(None)
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Load(e.to_string()))
    }
}

impl TextGenerator for OllamaBackend {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, GatewayError>> {
        Box::pin(async move {
            let generated = self.call(Some(prompt)).await?;
            log::debug!("Generated {} bytes", generated.response.len());
            Ok(decoded_text(prompt, &generated))
        })
    }
}

enum GatewayState {
    Ready(Box<dyn TextGenerator>),
    Unavailable(String),
}

/// Holds the model for the lifetime of the process. A failed load is final:
/// every later generation fails with the load error.
pub struct ModelGateway {
    state: GatewayState,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            GatewayState::Ready(_) => "ready".to_string(),
            GatewayState::Unavailable(reason) => format!("unavailable: {reason}"),
        };
        f.debug_struct("ModelGateway").field("state", &state).finish()
    }
}

impl ModelGateway {
    /// Loads the fixed model once. Never fails: a load error leaves the gateway
    /// unavailable and is reported through [`ModelGateway::status_message`].
    pub async fn initialize(endpoint: &str) -> Arc<Self> {
        let backend = OllamaBackend::new(endpoint);
        let gateway = match backend.load().await {
            Ok(()) => {
                log::info!("Model {} loaded", backend.model());
                Self::with_generator(backend)
            }
            Err(e) => {
                log::error!("{e}");
                Self::unavailable(e.to_string())
            }
        };
        Arc::new(gateway)
    }

    pub fn with_generator(generator: impl TextGenerator + 'static) -> Self {
        Self {
            state: GatewayState::Ready(Box::new(generator)),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: GatewayState::Unavailable(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, GatewayState::Ready(_))
    }

    /// The line a session shows about the model, `Ok` when it can generate.
    pub fn status_message(&self) -> Result<String, String> {
        match &self.state {
            GatewayState::Ready(_) => Ok(LOADED_MESSAGE.to_string()),
            GatewayState::Unavailable(reason) => Err(reason.clone()),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        match &self.state {
            GatewayState::Ready(generator) => generator.generate(prompt).await,
            GatewayState::Unavailable(reason) => Err(GatewayError::Unavailable(reason.clone())),
        }
    }
}
