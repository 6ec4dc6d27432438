//! Optional free-text narrative for monthly reports.
//!
//! The report is complete without a narrative. A [`Summarizer`] may add one; any failure is
//! logged and the report goes out with its templated summary only.

use crate::{
    config::settings::SummarizerConfig,
    core::{monthly::MonthlyReport, report::format_indicator_line},
    errors::Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt::Write as _, time::Duration};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are an expert business analyst who writes professional, \
    detailed and actionable monthly management reports.";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces a narrative for a report, or nothing when unavailable.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns the narrative, or `None` if it could not be produced.
    async fn summarize(&self, report: &MonthlyReport) -> Option<String>;
}

/// Fills `report.narrative` when a summarizer is configured and succeeds.
pub async fn attach_narrative(report: &mut MonthlyReport, summarizer: Option<&dyn Summarizer>) {
    if let Some(summarizer) = summarizer {
        let narrative = summarizer.summarize(report).await;
        report.narrative = narrative;
    }
}

/// Builds the user prompt sent to the model.
#[must_use]
pub fn build_prompt(report: &MonthlyReport) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "AREA: {}", report.area);
    let _ = writeln!(prompt, "PERIOD: {}", report.period);
    let _ = writeln!(prompt, "\nKPI RESULTS:");
    for row in &report.indicators {
        let _ = writeln!(prompt, "{}", format_indicator_line(row));
    }
    let _ = writeln!(prompt, "\nPRELIMINARY ANALYSIS:");
    for line in &report.analysis {
        let _ = writeln!(prompt, "- {line}");
    }
    if !report.projects.is_empty() {
        let _ = writeln!(prompt, "\nPROJECTS:");
        for project in &report.projects {
            let _ = writeln!(prompt, "- {}: {}", project.name, project.status);
        }
    }
    let _ = write!(
        prompt,
        "\nWrite a 3-4 paragraph executive narrative interpreting these results, calling out \
         risks and concrete recommendations. Use a professional, objective tone and reply with \
         the narrative only."
    );
    prompt
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionSummarizer {
    client: reqwest::Client,
    config: SummarizerConfig,
    api_key: String,
}

impl ChatCompletionSummarizer {
    /// Builds a client for `config` authenticated with `api_key`.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: SummarizerConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    /// Builds a summarizer when enabled in `config` and `OPENAI_API_KEY` is set.
    ///
    /// The key is read from the environment here, right before use, and never stored in the
    /// config file.
    pub fn from_env(config: &SummarizerConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                info!(model = %config.model, "Report narratives enabled");
                Self::new(config.clone(), key.trim()).map(Some)
            }
            _ => {
                warn!("Summarizer enabled but OPENAI_API_KEY is not set; using templated reports");
                Ok(None)
            }
        }
    }

    async fn request(&self, report: &MonthlyReport) -> Result<Option<String>> {
        let prompt = build_prompt(report);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response: ChatResponse = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    async fn summarize(&self, report: &MonthlyReport) -> Option<String> {
        match self.request(report).await {
            Ok(Some(text)) => {
                info!(area = %report.area, period = %report.period, "Narrative generated");
                Some(text)
            }
            Ok(None) => {
                warn!(area = %report.area, period = %report.period, "Chat completion returned no content");
                None
            }
            Err(e) => {
                warn!(area = %report.area, period = %report.period, error = %e, "Narrative unavailable");
                None
            }
        }
    }
}
