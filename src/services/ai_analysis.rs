// src/services/ai_analysis.rs
//! Candidate analysis through an OpenAI compatible chat completion endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::common::config::AiConfig;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI analysis endpoint not configured")]
    NotConfigured,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// What the model gets to see about a candidate
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_description: Option<String>,
    pub notes: Vec<String>,
    pub attachments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub score: i64,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    pub recommendation: String,
}

#[async_trait]
pub trait AiAnalyzer: Send + Sync {
    async fn analyze(&self, task_type: &str, profile: &CandidateProfile) -> Result<AnalysisResult, AiError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    score: serde_json::Value,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    recommendation: String,
}

fn system_prompt(task_type: &str) -> String {
    let focus = match task_type {
        "cv_analysis" => "Analiza el perfil y los antecedentes del candidato respecto del cargo.",
        "candidate_scoring" => "Asigna un puntaje de ajuste del candidato al cargo.",
        _ => "Evalúa al candidato para el proceso de selección.",
    };
    format!(
        "Eres un analista experto en reclutamiento. {} Responde solo con un objeto JSON con las claves \
         score (entero 0-100), summary (texto), strengths (lista de textos), weaknesses (lista de textos) \
         y recommendation (uno de: avanzar, mantener, descartar).",
        focus
    )
}

/// Maps free-form model output onto the three stored recommendations
pub fn normalize_recommendation(value: &str, score: i64) -> String {
    let lower = value.trim().to_lowercase();
    let normalized = if lower.starts_with("avanz") || lower == "advance" || lower == "hire" {
        "avanzar"
    } else if lower.starts_with("descart") || lower == "reject" {
        "descartar"
    } else if lower.starts_with("manten") || lower == "hold" {
        "mantener"
    } else if score >= 70 {
        "avanzar"
    } else if score >= 40 {
        "mantener"
    } else {
        "descartar"
    };
    normalized.to_string()
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses the model answer, clamping the score into 0..=100
pub fn parse_analysis(content: &str) -> Result<AnalysisResult, AiError> {
    let raw: RawAnalysis = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AiError::InvalidResponse(format!("JSON inválido: {}", e)))?;

    let score = match &raw.score {
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(|f| f.round() as i64)
            .ok_or_else(|| AiError::InvalidResponse("score no numérico".to_string()))?,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.round() as i64)
            .map_err(|_| AiError::InvalidResponse("score no numérico".to_string()))?,
        _ => return Err(AiError::InvalidResponse("score ausente".to_string())),
    }
    .clamp(0, 100);

    Ok(AnalysisResult {
        score,
        summary: raw.summary,
        strengths: raw.strengths,
        weaknesses: raw.weaknesses,
        recommendation: normalize_recommendation(&raw.recommendation, score),
    })
}

#[derive(Debug, Clone)]
pub struct AiAnalysisClient {
    client: Client,
    config: AiConfig,
}

impl AiAnalysisClient {
    pub fn new(config: &AiConfig, client: Client) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Make API request with retry logic
    async fn make_request_with_retry(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AiError> {
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.make_request(api_key, request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        error = %e,
                        "AI analysis request failed, retrying..."
                    );
                    last_error = Some(e);

                    if attempt < max_retries {
                        let delay = std::time::Duration::from_millis(1000 * 2_u64.pow(attempt - 1));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::RequestFailed("Unknown error".to_string())))
    }

    async fn make_request(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AiError> {
        let response = self
            .client
            .post(&self.config.analysis_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "AI analysis request failed");
            return Err(AiError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl AiAnalyzer for AiAnalysisClient {
    async fn analyze(&self, task_type: &str, profile: &CandidateProfile) -> Result<AnalysisResult, AiError> {
        let api_key = self.config.api_key.as_deref().ok_or(AiError::NotConfigured)?;

        let profile_json = serde_json::to_string_pretty(profile)
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt(task_type),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Candidato:\n{}", profile_json),
                },
            ],
            temperature: 0.2,
            response_format: serde_json::json!({ "type": "json_object" }),
        };

        debug!(task_type = %task_type, model = %self.config.model, "Sending AI analysis request");

        let response = self.make_request_with_retry(api_key, &request).await?;

        let content = response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| AiError::InvalidResponse("No choices in response".to_string()))?;

        let result = parse_analysis(&content)?;

        info!(
            task_type = %task_type,
            score = result.score,
            tokens_used = response.usage.map(|u| u.total_tokens).unwrap_or(0),
            "AI analysis completed"
        );

        Ok(result)
    }
}
