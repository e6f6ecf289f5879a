//! Yes/no adjudication of ambiguous semantic candidates by a chat model.

use providers::{LlmProvider, ProviderError, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const PROMPT_TEMPLATE: &str = "\
You are reconciling two product catalogs. Decide whether the two product names below refer to the same physical product.

Matching rules:
1. The manufacturer or brand must be the same.
2. The package size must agree within a tolerance of 0.1 units.
3. The units of measure must be the same (for example oz, g, ml, lb).
4. The flavor or variant must be exactly the same.

Examples:
Correct match:
External: DIET LIPTON GREEN TEA W/ CITRUS 20 OZ
Internal: Lipton Diet Green Tea with Citrus (20oz)

Wrong match:
External: Hersheys Almond Milk Choco 1.6 oz
Internal: Hersheys Milk Chocolate with Almonds (1.85oz)

External Product: {external}
Internal Product: {internal}

";

const PARITY_INSTRUCTION: &str =
    "Respond with 'Yes' if they are the same product and 'No' if they are not.";

const STRICT_INSTRUCTION: &str = "Respond with only a JSON object of the form \
{\"same_product\": true} or {\"same_product\": false}.";

/// How a free-text reply is reduced to a verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictMode {
    /// Only a reply that is exactly "yes" (trimmed, any case) confirms.
    /// "Yes, these are the same product." is a rejection.
    #[default]
    Parity,
    /// The reply must be a `{"same_product": bool}` object; anything else is an error.
    Strict,
}

#[async_trait::async_trait]
pub trait Arbitrator: Send + Sync {
    async fn confirm(&self, external: &str, internal: &str) -> Result<bool, ProviderError>;
}

pub fn build_prompt(external: &str, internal: &str, mode: VerdictMode) -> String {
    let mut prompt = PROMPT_TEMPLATE
        .replace("{external}", external)
        .replace("{internal}", internal);
    prompt.push_str(match mode {
        VerdictMode::Parity => PARITY_INSTRUCTION,
        VerdictMode::Strict => STRICT_INSTRUCTION,
    });
    prompt
}

pub fn reduce_parity(reply: &str) -> bool {
    reply.trim().to_lowercase() == "yes"
}

pub fn reduce_strict(reply: &str) -> Result<bool, ProviderError> {
    #[derive(Deserialize)]
    struct StrictVerdict {
        same_product: bool,
    }

    let body = reply.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .and_then(|b| b.strip_suffix("```"))
        .unwrap_or(body)
        .trim();
    serde_json::from_str::<StrictVerdict>(body)
        .map(|v| v.same_product)
        .map_err(|e| ProviderError::InvalidResponse(format!("unparseable verdict {reply:?}: {e}")))
}

pub struct LlmArbitrator {
    llm: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    mode: VerdictMode,
}

impl LlmArbitrator {
    pub fn new(llm: Arc<dyn LlmProvider>, retry: RetryPolicy, mode: VerdictMode) -> Self {
        Self { llm, retry, mode }
    }
}

#[async_trait::async_trait]
impl Arbitrator for LlmArbitrator {
    async fn confirm(&self, external: &str, internal: &str) -> Result<bool, ProviderError> {
        let prompt = build_prompt(external, internal, self.mode);
        let resp = self
            .retry
            .run("arbitration", || self.llm.complete(&prompt))
            .await?;
        let verdict = match self.mode {
            VerdictMode::Parity => reduce_parity(&resp.content),
            VerdictMode::Strict => reduce_strict(&resp.content)?,
        };
        debug!(
            "arbitration `{}` vs `{}`: reply {:?} -> {}",
            external, internal, resp.content, verdict
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::CompletionResponse;
    use std::sync::Mutex;

    struct Scripted {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for Scripted {
        async fn complete(&self, prompt: &str) -> Result<CompletionResponse, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(CompletionResponse {
                content: self.reply.clone(),
            })
        }
    }

    #[test]
    fn parity_accepts_only_bare_yes() {
        assert!(reduce_parity("Yes"));
        assert!(reduce_parity("  YES \n"));
        assert!(!reduce_parity("Yes, these are the same product."));
        assert!(!reduce_parity("yes."));
        assert!(!reduce_parity("No"));
        assert!(!reduce_parity(""));
    }

    #[test]
    fn strict_parses_json_and_fenced_json() {
        assert!(reduce_strict(r#"{"same_product": true}"#).unwrap());
        assert!(!reduce_strict("```json\n{\"same_product\": false}\n```").unwrap());
        assert!(matches!(
            reduce_strict("Yes"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn prompt_carries_rules_and_names() {
        let prompt = build_prompt("Acme Bar 2oz", "ACME BAR 2 OZ", VerdictMode::Parity);
        assert!(prompt.contains("External Product: Acme Bar 2oz"));
        assert!(prompt.contains("Internal Product: ACME BAR 2 OZ"));
        assert!(prompt.contains("0.1 units"));
        assert!(prompt.contains("flavor"));
        assert!(prompt.ends_with(PARITY_INSTRUCTION));
        assert!(build_prompt("a", "b", VerdictMode::Strict).contains("same_product"));
    }

    #[tokio::test]
    async fn verbose_yes_is_rejected_in_parity_mode() {
        let llm = Scripted::new("Yes, these are the same product.");
        let arbiter = LlmArbitrator::new(llm.clone(), RetryPolicy::none(), VerdictMode::Parity);
        assert!(!arbiter.confirm("a", "b").await.unwrap());
        assert_eq!(llm.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn strict_mode_surfaces_unparseable_reply() {
        let llm = Scripted::new("Yes, these are the same product.");
        let arbiter = LlmArbitrator::new(llm, RetryPolicy::none(), VerdictMode::Strict);
        assert!(arbiter.confirm("a", "b").await.is_err());
    }
}
