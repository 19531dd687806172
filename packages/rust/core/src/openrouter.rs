//! OpenRouter chat-completions client, usable as a [`Scorer`] and a
//! [`Summarizer`].

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use leadscout_shared::{
    CandidateRecord, Lead, LeadScoutError, OpenRouterConfig, QualityTier, Result,
    TargetingCriteria,
};

use crate::scoring::Scorer;
use crate::summary::{self, Summarizer};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin client over `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(config: &OpenRouterConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("LeadScout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.completions_url()?,
            api_key: api_key.into(),
            model: config.default_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user prompt and return the first choice's text.
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: String, temperature: f32, max_tokens: Option<u32>) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LeadScoutError::Network(format!("openrouter request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadScoutError::Network(format!(
                "openrouter returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::parse(format!("openrouter response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LeadScoutError::parse("openrouter response had no choices"))?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

#[async_trait]
impl Scorer for OpenRouterClient {
    async fn score(
        &self,
        candidate: &CandidateRecord,
        criteria: &TargetingCriteria,
    ) -> Result<f64> {
        let reply = self
            .complete(scoring_prompt(candidate, criteria), 0.3, Some(10))
            .await
            .map_err(|e| LeadScoutError::Scoring(e.to_string()))?;
        parse_score(&reply)
    }
}

#[async_trait]
impl Summarizer for OpenRouterClient {
    async fn summarize(
        &self,
        leads: &[Lead],
        criteria: &TargetingCriteria,
    ) -> Result<serde_json::Value> {
        let reply = self
            .complete(summary_prompt(leads, criteria), 0.5, None)
            .await
            .map_err(|e| LeadScoutError::Summarization(e.to_string()))?;
        Ok(parse_narrative(&reply))
    }
}

// ---------------------------------------------------------------------------
// Prompts and reply parsing
// ---------------------------------------------------------------------------

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

fn scoring_prompt(candidate: &CandidateRecord, criteria: &TargetingCriteria) -> String {
    format!(
        "Score this lead from 0-100 based on how well they match the ideal customer profile.\n\n\
         Lead:\n\
         - Name: {name}\n\
         - Job title: {title}\n\
         - Company: {company}\n\
         - Industry: {industry}\n\
         - Company size: {size}\n\
         - Location: {location}\n\n\
         Target profile:\n\
         - Industry: {want_industry}\n\
         - Company size: {want_size}\n\
         - Location: {want_location}\n\
         - Job titles: {titles}\n\
         - Keywords: {keywords}\n\
         - Technologies: {technologies}\n\n\
         Weights: job title 40, industry 25, company size 15, location 10, \
         technology/keyword relevance 10.\n\
         Reply with the numeric score only.",
        name = candidate.display_name(),
        title = or_unknown(candidate.job_title.as_deref()),
        company = candidate.company,
        industry = or_unknown(candidate.industry.as_deref()),
        size = or_unknown(candidate.company_size.as_deref()),
        location = or_unknown(candidate.location.as_deref()),
        want_industry = criteria.industry.as_deref().unwrap_or("any"),
        want_size = criteria.company_size.map(|s| s.as_str()).unwrap_or("any"),
        want_location = criteria.location.as_deref().unwrap_or("any"),
        titles = criteria.job_titles.join(", "),
        keywords = criteria.keywords.join(", "),
        technologies = criteria.technologies.join(", "),
    )
}

fn summary_prompt(leads: &[Lead], criteria: &TargetingCriteria) -> String {
    let count = |tier: QualityTier| leads.iter().filter(|l| l.quality_tier == tier).count();
    let average = if leads.is_empty() {
        0.0
    } else {
        leads.iter().map(|l| l.quality_score).sum::<f64>() / leads.len() as f64
    };
    let companies: Vec<String> = summary::top_companies(leads, summary::TOP_COMPANIES)
        .into_iter()
        .map(|c| c.company)
        .collect();

    format!(
        "Analyze these lead generation results.\n\n\
         Search criteria:\n{criteria}\n\n\
         Results:\n\
         - Total leads: {total}\n\
         - Hot: {hot}\n\
         - Warm: {warm}\n\
         - Cold: {cold}\n\
         - Average score: {average:.1}\n\
         - Top companies: {companies}\n\n\
         Provide a quality assessment, industry distribution, geographic insights, \
         recommended next actions, and improvement suggestions. \
         Return structured JSON.",
        criteria = serde_json::to_string_pretty(criteria).unwrap_or_default(),
        total = leads.len(),
        hot = count(QualityTier::Hot),
        warm = count(QualityTier::Warm),
        cold = count(QualityTier::Cold),
        companies = companies.join(", "),
    )
}

/// First number in the reply, unclamped.
pub fn parse_score(reply: &str) -> Result<f64> {
    let found = NUMBER
        .find(reply)
        .ok_or_else(|| LeadScoutError::Scoring(format!("no number in reply: {reply:?}")))?;
    found
        .as_str()
        .parse::<f64>()
        .map_err(|e| LeadScoutError::Scoring(e.to_string()))
}

/// JSON from the reply, bare or inside a code fence. Anything else is kept
/// as `{"summary": <text>}`.
pub fn parse_narrative(reply: &str) -> serde_json::Value {
    let trimmed = reply.trim();
    let body = strip_fence(trimmed).unwrap_or(trimmed);
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::json!({ "summary": trimmed }))
}

fn strip_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.rfind("```")?;
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_shared::{SourceKind, TaskId};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> OpenRouterConfig {
        OpenRouterConfig {
            base_url: format!("{}/api/v1", server.uri()),
            default_model: "test/model".into(),
            ..Default::default()
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "gen-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    #[test]
    fn summary_prompt_lists_each_company_once() {
        let criteria = TargetingCriteria::default();
        let leads: Vec<Lead> = ["Acme", "Globex", "Acme", "Initech", "Globex"]
            .into_iter()
            .map(|company| {
                Lead::from_candidate(
                    CandidateRecord::new(SourceKind::LinkedIn, company),
                    TaskId::new(),
                    60.0,
                )
            })
            .collect();

        let prompt = summary_prompt(&leads, &criteria);
        assert!(prompt.contains("- Top companies: Acme, Globex, Initech\n"), "{prompt}");
        assert!(prompt.contains("- Total leads: 5"));
    }

    #[test]
    fn score_parsing() {
        assert_eq!(parse_score("85").unwrap(), 85.0);
        assert_eq!(parse_score("Score: 72.5/100").unwrap(), 72.5);
        assert_eq!(parse_score("150").unwrap(), 150.0);
        assert_eq!(parse_score("-5").unwrap(), -5.0);
        assert!(matches!(parse_score("great fit!"), Err(LeadScoutError::Scoring(_))));
    }

    #[test]
    fn narrative_parsing() {
        assert_eq!(
            parse_narrative(r#"{"quality": "high"}"#),
            serde_json::json!({"quality": "high"})
        );
        assert_eq!(
            parse_narrative("```json\n{\"quality\": \"mixed\"}\n```"),
            serde_json::json!({"quality": "mixed"})
        );
        assert_eq!(
            parse_narrative("Mostly mid-market SaaS."),
            serde_json::json!({"summary": "Mostly mid-market SaaS."})
        );
    }

    #[tokio::test]
    async fn scores_via_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"model": "test/model", "max_tokens": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("88")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(&config(&server), "test-key").unwrap();
        let candidate = CandidateRecord::new(SourceKind::LinkedIn, "Acme").with_job_title("CTO");
        let score = client
            .score(&candidate, &TargetingCriteria::default())
            .await
            .unwrap();
        assert_eq!(score, 88.0);
    }

    #[tokio::test]
    async fn http_error_is_scoring_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(&config(&server), "test-key").unwrap();
        let err = client
            .score(
                &CandidateRecord::new(SourceKind::Api, "Acme"),
                &TargetingCriteria::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeadScoutError::Scoring(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn summarizes_via_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("```json\n{\"next_actions\": [\"call\"]}\n```")),
            )
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(&config(&server), "test-key").unwrap();
        let leads = vec![Lead::from_candidate(
            CandidateRecord::new(SourceKind::LinkedIn, "Acme"),
            TaskId::new(),
            90.0,
        )];
        let analysis = client
            .summarize(&leads, &TargetingCriteria::default())
            .await
            .unwrap();
        assert_eq!(analysis, serde_json::json!({"next_actions": ["call"]}));
    }

    #[tokio::test]
    async fn empty_choices_is_summarization_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(&config(&server), "test-key").unwrap();
        let err = client
            .summarize(&[], &TargetingCriteria::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LeadScoutError::Summarization(_)));
    }
}
