//! Prompt assembly for email draft generation.
//!
//! The instruction template and style guide are held as versioned template
//! data rather than inlined into the pipeline, so prompt revisions can be
//! audited and tested independently of code changes. Rendering is a pure
//! function: identical lead, product, and template version always produce an
//! identical prompt string.

use crate::draft::{LeadRecord, ProductDetails};
use crate::error::ApiError;
use std::collections::HashMap;

/// Template version used when the configuration does not pin one.
pub const DEFAULT_TEMPLATE_VERSION: &str = "v1";

const INSTRUCTION_V1: &str = "\
You are a B2B expert marketer. Based on the lead's details and the product \
document provided, write a personalized email to the lead in a concise \
manner, keeping in mind they have limited time to read it. The tone should \
be casual, friendly and direct, not formal. Avoid unnecessary words and \
flattery. Each email must have:\n\
1. **Subject:** catchy, highly personalized, relevant to the lead's profile.\n\
2. **Body:** open by mentioning you were going through their profile and say \
something specific about their company. In the next paragraph, name a problem \
in their company's industry and introduce the product, stating how it solves \
that problem, drawing on the product information. Close with a compelling \
call to action asking to schedule a call or meeting.\n\
Keep it short, direct and catchy. Avoid formal jargon and stock openers such \
as \"I hope this email finds you well\". It should read as if written by a \
human who carefully studied the lead's profile and company.";

const STYLE_V1: &str = "\
Do not use stock templates or openers.\n\
Do not pad with flattery or filler.\n\
Be casual, friendly and direct, with a human tone:\n\
1. First-person pronouns: I, me, my, we, us, our. Write as one person \
talking to the lead; avoid generalized statements.\n\
2. Informal markers where natural: kinda, actually, basically; contractions \
like gonna, wanna.\n\
3. Personal experience markers: I think, I believe, last week, my boss said.\n\
4. The occasional minor typo is acceptable (definately, alot, seperate).\n\
5. Spontaneous expressions: wow, amazing, love it, so cool.";

/// A single prompt template version: the marketer instruction plus the style
/// guide appended to every generation request.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub version: String,
    pub instruction: String,
    pub style: String,
}

impl PromptTemplate {
    /// Combine the template, style guide, lead record, and product details
    /// into the single prompt string sent to the model.
    pub fn render(&self, lead: &LeadRecord, product: &ProductDetails) -> String {
        format!(
            "Based on the following lead details, product information and the \
             prompt, generate a personalized email for the lead.\n\n\
             prompt: ```{instruction}```\n\
             style: ```{style}```\n\
             Lead Details:\n{lead}\n\
             Product Information: {product}\n\n\
             Generate a personalized email following the format specified in \
             the prompt above.\n\
             Return the result as a JSON object with these keys:\n\
             1. 'subject': the email subject line\n\
             2. 'body': the email body content\n\n\
             Make sure the email is unique and highly personalized based on \
             the lead's profile and relevant product features.",
            instruction = self.instruction,
            style = self.style,
            lead = render_lead(lead),
            product = product.details,
        )
    }
}

fn render_lead(lead: &LeadRecord) -> String {
    format!(
        "Name: {}\n\
         Lead ID: {}\n\
         Current experience: {}\n\
         Education: {}\n\
         Company: {}\n\
         Company overview: {}\n\
         Company industry: {}",
        lead.name,
        lead.lead_id,
        lead.experience,
        lead.education,
        lead.company,
        lead.company_overview,
        lead.company_industry,
    )
}

/// Versioned registry of prompt templates.
pub struct PromptLibrary {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptLibrary {
    /// Library containing the built-in template versions.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            DEFAULT_TEMPLATE_VERSION.to_string(),
            PromptTemplate {
                version: DEFAULT_TEMPLATE_VERSION.to_string(),
                instruction: INSTRUCTION_V1.to_string(),
                style: STYLE_V1.to_string(),
            },
        );
        Self { templates }
    }

    pub fn get(&self, version: &str) -> Result<&PromptTemplate, ApiError> {
        self.templates.get(version).ok_or_else(|| {
            ApiError::ConfigError(format!("Unknown prompt template version: {}", version))
        })
    }
}
