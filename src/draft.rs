//! Request and result records for email draft generation.
//!
//! Every record here is request-scoped and immutable after construction;
//! nothing is persisted across requests.

use serde::{Deserialize, Serialize};

/// Lead identifier. Callers send either an integer or a string; both are
/// accepted and echoed back untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeadId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadId::Number(n) => write!(f, "{}", n),
            LeadId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Structured description of a sales prospect used to personalize output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: String,
    pub lead_id: LeadId,
    pub experience: String,
    pub education: String,
    pub company: String,
    pub company_overview: String,
    pub company_industry: String,
}

/// Free-text description of the product being pitched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetails {
    pub details: String,
}

/// Generated subject/body pair plus the echoed lead identifier.
///
/// `lead_id` always equals the identifier of the lead the draft was generated
/// from, including drafts that stand in for failed generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    pub lead_id: LeadId,
}

/// Per-lead generation outcome.
///
/// Batch processing never aborts on a single lead; a failure is recorded as
/// data alongside the error-marker draft that stands in for it, so both
/// outcomes stay representable and testable.
#[derive(Debug, Clone)]
pub enum DraftOutcome {
    Generated(EmailDraft),
    Failed { draft: EmailDraft, reason: String },
}

impl DraftOutcome {
    pub fn draft(&self) -> &EmailDraft {
        match self {
            DraftOutcome::Generated(draft) => draft,
            DraftOutcome::Failed { draft, .. } => draft,
        }
    }

    pub fn into_draft(self) -> EmailDraft {
        match self {
            DraftOutcome::Generated(draft) => draft,
            DraftOutcome::Failed { draft, .. } => draft,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DraftOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_id_accepts_integer_and_string() {
        let numeric: LeadId = serde_json::from_str("1010101").unwrap();
        assert_eq!(numeric, LeadId::Number(1010101));

        let text: LeadId = serde_json::from_str("\"abc-42\"").unwrap();
        assert_eq!(text, LeadId::Text("abc-42".to_string()));
    }

    #[test]
    fn lead_id_round_trips_untagged() {
        let id = LeadId::Number(7847638);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7847638");

        let id = LeadId::Text("L-99".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"L-99\"");
    }

    #[test]
    fn outcome_exposes_inner_draft() {
        let draft = EmailDraft {
            subject: "s".into(),
            body: "b".into(),
            lead_id: LeadId::Number(1),
        };
        let failed = DraftOutcome::Failed {
            draft: draft.clone(),
            reason: "provider down".into(),
        };
        assert!(failed.is_failed());
        assert_eq!(failed.draft().subject, "s");
        assert_eq!(failed.into_draft().lead_id, LeadId::Number(1));
    }
}
