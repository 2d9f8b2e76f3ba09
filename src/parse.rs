//! Model reply parsing.
//!
//! The unstructured invocation path returns free text that is usually JSON,
//! sometimes wrapped in markdown fences, occasionally a Python-style literal.
//! Replies are normalized and decoded strictly into a declared payload type;
//! anything unrecoverable becomes a `ParseError` carrying the raw reply for
//! diagnostics. The raw text is never evaluated as code.

use crate::draft::{EmailDraft, LeadRecord};
use crate::error::ApiError;
use serde::Deserialize;

/// Declared shape of a model reply. The model may include extra keys (its own
/// idea of a lead id among them); they are ignored, both `subject` and `body`
/// are required.
#[derive(Debug, Deserialize)]
struct ReplyPayload {
    subject: String,
    body: String,
}

/// Strip surrounding markdown code fences and a leading language tag.
pub fn normalize_reply(raw: &str) -> String {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = text.trim_start_matches('`');
        text = text.trim_end().trim_end_matches('`');
        text = text.trim();
    }
    if let Some(rest) = text.strip_prefix("json") {
        let rest = rest.trim_start();
        if rest.starts_with('{') || rest.starts_with('[') {
            text = rest;
        }
    }
    text.trim().to_string()
}

/// Rewrite a Python-literal dictionary into JSON without evaluating it:
/// single-quoted strings become JSON strings, `None`/`True`/`False` become
/// JSON literals. Content inside strings is preserved.
fn python_literal_to_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let mut chars = text.chars().peekable();

    fn flush_word(out: &mut String, word: &mut String) {
        match word.as_str() {
            "None" => out.push_str("null"),
            "True" => out.push_str("true"),
            "False" => out.push_str("false"),
            _ => out.push_str(word),
        }
        word.clear();
    }

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                flush_word(&mut out, &mut word);
                let quote = c;
                out.push('"');
                while let Some(c) = chars.next() {
                    if c == '\\' {
                        match chars.next() {
                            // \' is a Python escape with no JSON equivalent
                            Some('\'') => out.push('\''),
                            Some(next) => {
                                out.push('\\');
                                out.push(next);
                            }
                            None => break,
                        }
                    } else if c == quote {
                        break;
                    } else if c == '"' {
                        out.push_str("\\\"");
                    } else if c == '\n' {
                        out.push_str("\\n");
                    } else {
                        out.push(c);
                    }
                }
                out.push('"');
            }
            c if c.is_alphanumeric() || c == '_' => word.push(c),
            c => {
                flush_word(&mut out, &mut word);
                out.push(c);
            }
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn decode(normalized: &str) -> Result<ReplyPayload, serde_json::Error> {
    serde_json::from_str::<ReplyPayload>(normalized)
        .or_else(|_| serde_json::from_str::<ReplyPayload>(&python_literal_to_json(normalized)))
}

/// Recover a draft from a free-text model reply.
///
/// The lead identifier is always taken from the originating record; the
/// model's claimed identifier is never trusted.
pub fn parse_reply(raw: &str, lead: &LeadRecord) -> Result<EmailDraft, ApiError> {
    let normalized = normalize_reply(raw);
    match decode(&normalized) {
        Ok(payload) => Ok(EmailDraft {
            subject: payload.subject,
            body: payload.body,
            lead_id: lead.lead_id.clone(),
        }),
        Err(err) => Err(ApiError::ParseError {
            reason: err.to_string(),
            raw: raw.to_string(),
        }),
    }
}

/// Decode a schema-constrained reply from the structured invocation path.
/// No fence handling and no permissive fallback: the provider promised
/// conformant JSON, so any decode failure is a hard parse error.
pub fn parse_structured(raw: &str, lead: &LeadRecord) -> Result<EmailDraft, ApiError> {
    match serde_json::from_str::<ReplyPayload>(raw) {
        Ok(payload) => Ok(EmailDraft {
            subject: payload.subject,
            body: payload.body,
            lead_id: lead.lead_id.clone(),
        }),
        Err(err) => Err(ApiError::ParseError {
            reason: err.to_string(),
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::LeadId;

    fn lead() -> LeadRecord {
        LeadRecord {
            name: "John Doe".into(),
            lead_id: LeadId::Number(7847638),
            experience: "Senior Data Scientist".into(),
            education: "M.S. Computer Science".into(),
            company: "TechCorp Inc.".into(),
            company_overview: "Enterprise software".into(),
            company_industry: "Technology".into(),
        }
    }

    #[test]
    fn fenced_reply_parses_identically_to_bare_object() {
        let fenced = "```json\n{\"subject\":\"A\",\"body\":\"B\"}\n```";
        let bare = "{\"subject\":\"A\",\"body\":\"B\"}";

        let from_fenced = parse_reply(fenced, &lead()).unwrap();
        let from_bare = parse_reply(bare, &lead()).unwrap();
        assert_eq!(from_fenced.subject, from_bare.subject);
        assert_eq!(from_fenced.body, from_bare.body);
        assert_eq!(from_fenced.lead_id, LeadId::Number(7847638));
    }

    #[test]
    fn language_tag_without_fences_is_tolerated() {
        let tagged = "json {\"subject\":\"A\",\"body\":\"B\"}";
        let draft = parse_reply(tagged, &lead()).unwrap();
        assert_eq!(draft.subject, "A");
    }

    #[test]
    fn subject_starting_with_json_is_not_mangled() {
        let reply = "{\"subject\":\"json tips\",\"body\":\"B\"}";
        let draft = parse_reply(reply, &lead()).unwrap();
        assert_eq!(draft.subject, "json tips");
    }

    #[test]
    fn python_literal_dictionary_is_accepted() {
        let reply = "{'subject': 'Quick one', 'body': 'We\\'ve met before', 'lead_id': None}";
        let draft = parse_reply(reply, &lead()).unwrap();
        assert_eq!(draft.subject, "Quick one");
        assert_eq!(draft.body, "We've met before");
        // lead id comes from the record, not the reply
        assert_eq!(draft.lead_id, LeadId::Number(7847638));
    }

    #[test]
    fn missing_subject_is_a_parse_error() {
        let reply = "{\"body\":\"B\"}";
        let err = parse_reply(reply, &lead()).unwrap_err();
        match err {
            ApiError::ParseError { raw, .. } => assert_eq!(raw, reply),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn missing_body_is_a_parse_error() {
        let err = parse_reply("{\"subject\":\"A\"}", &lead()).unwrap_err();
        assert!(matches!(err, ApiError::ParseError { .. }));
    }

    #[test]
    fn prose_reply_is_a_parse_error_carrying_the_raw_text() {
        let reply = "Sure! Here's your email draft.";
        let err = parse_reply(reply, &lead()).unwrap_err();
        match err {
            ApiError::ParseError { raw, .. } => assert_eq!(raw, reply),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn model_supplied_lead_id_is_ignored() {
        let reply = "{\"subject\":\"A\",\"body\":\"B\",\"lead_id\":999}";
        let draft = parse_reply(reply, &lead()).unwrap();
        assert_eq!(draft.lead_id, LeadId::Number(7847638));
    }

    #[test]
    fn structured_path_rejects_fenced_output() {
        let fenced = "```json\n{\"subject\":\"A\",\"body\":\"B\"}\n```";
        assert!(parse_structured(fenced, &lead()).is_err());
        assert!(parse_structured("{\"subject\":\"A\",\"body\":\"B\"}", &lead()).is_ok());
    }

    #[test]
    fn multiline_python_string_is_rewritten() {
        let reply = "{'subject': 'Hi', 'body': 'line one\nline two'}";
        let draft = parse_reply(reply, &lead()).unwrap();
        assert_eq!(draft.body, "line one\nline two");
    }
}
