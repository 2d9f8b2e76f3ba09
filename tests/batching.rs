//! Property-based tests for batch-shape guarantees.
//!
//! For any non-empty lead sequence the processor must return one outcome per
//! lead in input order, and must pause exactly once between consecutive
//! batches.

use async_trait::async_trait;
use outreach::draft::{LeadId, LeadRecord, ProductDetails};
use outreach::error::ApiError;
use outreach::generation::EmailGenerator;
use outreach::prompt::{PromptLibrary, DEFAULT_TEMPLATE_VERSION};
use outreach::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Provider that always answers with a fixed well-formed draft.
struct EchoProvider {
    calls: AtomicUsize,
}

impl EchoProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ModelProviderClient for EchoProvider {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionResponse {
            content: "{\"subject\":\"Hi\",\"body\":\"Hello\"}".to_string(),
            model: "echo".to_string(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

fn leads(count: usize) -> Vec<LeadRecord> {
    (0..count)
        .map(|n| LeadRecord {
            name: format!("Lead {}", n),
            lead_id: LeadId::Number(n as i64),
            experience: "PM".into(),
            education: "MBA".into(),
            company: "Acme".into(),
            company_overview: "Widgets".into(),
            company_industry: "Manufacturing".into(),
        })
        .collect()
}

fn generator(provider: Arc<EchoProvider>, pauses: Arc<AtomicUsize>) -> EmailGenerator {
    let template = PromptLibrary::builtin()
        .get(DEFAULT_TEMPLATE_VERSION)
        .unwrap()
        .clone();
    EmailGenerator::new(provider, template)
        .with_batch_pause(Duration::ZERO)
        .with_pause_hook(move || {
            pauses.fetch_add(1, Ordering::SeqCst);
        })
}

#[test]
fn batch_shape_properties_hold_for_any_lead_count() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let runtime = tokio::runtime::Runtime::new().unwrap();

    runner
        .run(&(1usize..40), |count| {
            let provider = Arc::new(EchoProvider::new());
            let pauses = Arc::new(AtomicUsize::new(0));
            let generator = generator(provider.clone(), pauses.clone());
            let product = ProductDetails {
                details: "A data platform.".into(),
            };

            let outcomes = runtime
                .block_on(generator.generate_batch(&leads(count), &product))
                .unwrap();

            // one outcome per lead, in input order
            prop_assert_eq!(outcomes.len(), count);
            for (n, outcome) in outcomes.iter().enumerate() {
                prop_assert_eq!(outcome.draft().lead_id.clone(), LeadId::Number(n as i64));
            }

            // one provider call per lead
            prop_assert_eq!(provider.calls.load(Ordering::SeqCst), count);

            // pauses between consecutive batches of 5, none after the last
            let expected_pauses = count.div_ceil(5) - 1;
            prop_assert_eq!(pauses.load(Ordering::SeqCst), expected_pauses);

            Ok(())
        })
        .unwrap();
}

#[test]
fn twelve_leads_pause_twice() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let provider = Arc::new(EchoProvider::new());
    let pauses = Arc::new(AtomicUsize::new(0));
    let generator = generator(provider, pauses.clone());
    let product = ProductDetails {
        details: "A data platform.".into(),
    };

    let outcomes = runtime
        .block_on(generator.generate_batch(&leads(12), &product))
        .unwrap();

    assert_eq!(outcomes.len(), 12);
    assert_eq!(pauses.load(Ordering::SeqCst), 2);
}
