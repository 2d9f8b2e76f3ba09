//! Email generation pipeline.
//!
//! Composes prompt assembly, provider invocation, and reply parsing into the
//! single-lead operation, and wraps it in the fixed-size sequential batch
//! loop used by the multi-lead endpoint. Leads are processed one at a time;
//! the only suspension points are the provider calls and the fixed pause
//! between batches.

use crate::config::OutreachConfig;
use crate::draft::{DraftOutcome, EmailDraft, LeadRecord, ProductDetails};
use crate::error::ApiError;
use crate::parse;
use crate::prompt::{PromptLibrary, PromptTemplate};
use crate::provider::{
    complete_with_retry, ChatMessage, CompletionOptions, InvocationMode, MessageRole,
    ModelProviderClient, OpenAIClient, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(2);

/// Behavior when the provider is unreachable after retries or credentials
/// are absent (unstructured path only).
///
/// `Fallback` keeps the endpoint available in degraded mode by returning a
/// canned, non-personalized draft; `Fail` propagates the error. The
/// structured path always fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradedMode {
    Fallback,
    Fail,
}

impl Default for DegradedMode {
    fn default() -> Self {
        DegradedMode::Fallback
    }
}

const FALLBACK_SUBJECT: &str = "A quick idea for [Company]";

const FALLBACK_BODY: &str = "\
Hi [Name],\n\n\
I was looking through your profile and your work at [Company] stood out to \
me. Our platform helps teams in your industry cut manual analysis time and \
make decisions faster, and I think it could do the same for you.\n\n\
I'd love to walk you through it on a short call next week. Would you be open \
to 30 minutes?\n\n\
Best regards,\n\
[Your Name]\n\
[Your Position]\n\
[Your Company]\n\
[Your Contact Information]\n\
Replace [Name] and [Company] with the lead's details, and the sender \
placeholders with the information given in the product details.";

/// Canned placeholder returned in degraded mode. Non-personalized except for
/// the echoed lead identifier.
pub fn fallback_draft(lead: &LeadRecord) -> EmailDraft {
    EmailDraft {
        subject: FALLBACK_SUBJECT.to_string(),
        body: FALLBACK_BODY.to_string(),
        lead_id: lead.lead_id.clone(),
    }
}

fn error_draft(lead: &LeadRecord, err: &ApiError) -> EmailDraft {
    EmailDraft {
        subject: "Error generating email".to_string(),
        body: format!("Error generating personalized email: {}", err),
        lead_id: lead.lead_id.clone(),
    }
}

/// Failures maskable by the degraded-mode fallback: the provider being
/// unreachable (after retries) or credentials being absent. Permanent
/// request failures and parse errors are not masked.
fn is_maskable(err: &ApiError) -> bool {
    err.is_transient()
        || matches!(
            err,
            ApiError::ConfigError(_) | ApiError::ProviderAuthFailed(_)
        )
}

type PauseHook = Arc<dyn Fn() + Send + Sync>;

/// Draft generator: one provider client, one template, fixed options.
///
/// Holds no mutable state; a single instance is shared across requests.
pub struct EmailGenerator {
    provider: Arc<dyn ModelProviderClient>,
    template: PromptTemplate,
    options: CompletionOptions,
    retry: RetryPolicy,
    mode: InvocationMode,
    degraded: DegradedMode,
    batch_size: usize,
    batch_pause: Duration,
    pause_hook: Option<PauseHook>,
}

impl EmailGenerator {
    pub fn new(provider: Arc<dyn ModelProviderClient>, template: PromptTemplate) -> Self {
        Self {
            provider,
            template,
            options: CompletionOptions::default(),
            retry: RetryPolicy::default(),
            mode: InvocationMode::default(),
            degraded: DegradedMode::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
            pause_hook: None,
        }
    }

    /// Build a generator backed by the configured OpenAI-compatible provider.
    pub fn from_config(config: &OutreachConfig) -> Result<Self, ApiError> {
        let library = PromptLibrary::builtin();
        let template = library.get(&config.provider.template_version)?.clone();

        let client = OpenAIClient::new(
            config.provider.model.clone(),
            config.provider.resolve_api_key(),
            config.provider.base_url.clone(),
            config.provider.mode,
        )?;

        Ok(Self::new(Arc::new(client), template)
            .with_options(CompletionOptions {
                temperature: Some(config.provider.temperature),
                max_tokens: Some(config.provider.max_tokens),
            })
            .with_invocation_mode(config.provider.mode)
            .with_degraded_mode(config.provider.degraded_mode)
            .with_retry_policy(config.generation.retry.to_policy())
            .with_batch_size(config.generation.batch_size)
            .with_batch_pause(config.generation.batch_pause()))
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_invocation_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_degraded_mode(mut self, degraded: DegradedMode) -> Self {
        self.degraded = degraded;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    /// Observer invoked once per inter-batch pause.
    pub fn with_pause_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.pause_hook = Some(Arc::new(hook));
        self
    }

    /// Generate a draft for one lead: prompt assembly, provider invocation
    /// with retry, reply parsing. The returned draft always carries the
    /// lead's own identifier.
    pub async fn generate_single(
        &self,
        lead: &LeadRecord,
        product: &ProductDetails,
    ) -> Result<EmailDraft, ApiError> {
        let prompt = self.template.render(lead, product);
        let messages = vec![ChatMessage {
            role: MessageRole::User,
            content: prompt,
        }];

        let reply = complete_with_retry(
            self.provider.as_ref(),
            messages,
            self.options.clone(),
            &self.retry,
        )
        .await;

        match self.mode {
            InvocationMode::Structured => parse::parse_structured(&reply?.content, lead),
            InvocationMode::Unstructured => match reply {
                Ok(reply) => parse::parse_reply(&reply.content, lead),
                Err(err) if self.degraded == DegradedMode::Fallback && is_maskable(&err) => {
                    warn!(
                        lead_id = %lead.lead_id,
                        error = %err,
                        "provider unavailable, returning fallback draft"
                    );
                    Ok(fallback_draft(lead))
                }
                Err(err) => Err(err),
            },
        }
    }

    /// Generate drafts for an ordered sequence of leads against one product.
    ///
    /// Leads are processed strictly sequentially in batches of at most
    /// `batch_size`, with a fixed pause between batches (none after the
    /// last). A failed lead becomes a `DraftOutcome::Failed` carrying an
    /// error-marker draft with the original identifier; the batch continues.
    /// The result has one outcome per input lead, in input order.
    pub async fn generate_batch(
        &self,
        leads: &[LeadRecord],
        product: &ProductDetails,
    ) -> Result<Vec<DraftOutcome>, ApiError> {
        if leads.is_empty() {
            return Err(ApiError::InvalidRequest(
                "No leads provided in the list".to_string(),
            ));
        }

        let mut outcomes = Vec::with_capacity(leads.len());
        let batch_count = leads.len().div_ceil(self.batch_size);

        for (index, batch) in leads.chunks(self.batch_size).enumerate() {
            info!(
                batch = index + 1,
                batches = batch_count,
                leads = batch.len(),
                "processing lead batch"
            );
            for lead in batch {
                match self.generate_single(lead, product).await {
                    Ok(draft) => outcomes.push(DraftOutcome::Generated(draft)),
                    Err(err) => {
                        warn!(lead = %lead.name, error = %err, "failed to generate draft");
                        outcomes.push(DraftOutcome::Failed {
                            draft: error_draft(lead, &err),
                            reason: err.to_string(),
                        });
                    }
                }
            }

            if index + 1 < batch_count {
                if let Some(hook) = &self.pause_hook {
                    hook();
                }
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        Ok(outcomes)
    }
}
