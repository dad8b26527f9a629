mod openai;
mod settings;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::AnalysisError;

pub use openai::OpenAiNarrativeClient;
pub use settings::{LlmFileConfig, LlmSettings};

/// Instructions sent ahead of the raw contract text.
pub const PROMPT_PREAMBLE: &str = "You are a legal assistant for Indian small and medium businesses.

Your tasks:
1. Identify the contract type.
2. Summarize the contract in simple business English.
3. Identify risky clauses such as termination, penalty, indemnity, jurisdiction, IP ownership.
4. Assign an overall risk score: Low, Medium, or High.
5. Suggest 2 renegotiation tips.";

/// Pre-written analysis shown when the language-model request fails for any reason.
pub const FALLBACK_NARRATIVE: &str = "Contract Type: Service Agreement

Overall Risk Score: MEDIUM-HIGH

Plain-English Summary:
This contract outlines service delivery in exchange for payment over a fixed period.
Certain clauses strongly favor one party and may expose the other party to legal
and financial risks.

Identified Risky Clauses:
- Unilateral termination rights allowing one party to exit without cause
- Penalty clause for delayed payments
- Intellectual Property ownership fully transferred to the client
- Jurisdiction restricted to a single city

Renegotiation Suggestions:
1. Request mutual termination rights with equal notice period.
2. Negotiate shared or retained ownership of intellectual property created.
";

/// Full prompt for one contract: the fixed preamble followed by the raw text.
pub fn build_prompt(contract_text: &str) -> String {
    format!("{PROMPT_PREAMBLE}\n\nContract Text:\n{contract_text}\n")
}

/// Client abstraction for requesting a free-text contract analysis from a language model.
#[async_trait]
pub trait NarrativeClient: Send + Sync {
    /// Send the contract text once and return the model's answer verbatim.
    async fn narrate(&self, contract_text: &str) -> Result<String>;
}

/// Client that never reaches a service. Every call fails, so callers end on the fallback.
#[derive(Debug, Default, Clone)]
pub struct NoopNarrativeClient;

#[async_trait]
impl NarrativeClient for NoopNarrativeClient {
    async fn narrate(&self, _contract_text: &str) -> Result<String> {
        bail!("narrative provider `noop` does not issue requests")
    }
}

/// Which branch a narrative request ended on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NarrativeOutcome {
    /// The service answered; `narrative` is its response, unmodified.
    Generated { narrative: String },
    /// The request failed; `narrative` is [`FALLBACK_NARRATIVE`].
    Fallback { narrative: String, reason: String },
}

impl NarrativeOutcome {
    pub fn narrative(&self) -> &str {
        match self {
            Self::Generated { narrative } | Self::Fallback { narrative, .. } => narrative,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Request a narrative exactly once, degrading to [`FALLBACK_NARRATIVE`] on any client error.
///
/// Blank input is rejected before any request is made.
pub async fn narrate_or_fallback(
    client: &dyn NarrativeClient,
    contract_text: &str,
) -> Result<NarrativeOutcome, AnalysisError> {
    if contract_text.trim().is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    match client.narrate(contract_text).await {
        Ok(narrative) => {
            info!(chars = narrative.len(), "narrative generated");
            Ok(NarrativeOutcome::Generated { narrative })
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "narrative request failed; using fallback");
            Ok(NarrativeOutcome::Fallback {
                narrative: FALLBACK_NARRATIVE.to_string(),
                reason: format!("{err:#}"),
            })
        }
    }
}

/// Build the client named by `settings.provider`.
pub fn client_from_settings(settings: &LlmSettings) -> Result<Box<dyn NarrativeClient>> {
    match settings.provider.to_ascii_lowercase().as_str() {
        "openai" => Ok(Box::new(OpenAiNarrativeClient::new(settings)?)),
        "noop" => Ok(Box::new(NoopNarrativeClient)),
        other => bail!("unsupported narrative provider `{other}` (expected `openai` or `noop`)"),
    }
}
