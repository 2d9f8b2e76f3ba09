//! Outreach: Personalized Email Draft Generation
//!
//! An HTTP service that turns structured lead and product data into marketing
//! email drafts by templating a prompt and delegating generation to an
//! external LLM provider.

pub mod config;
pub mod draft;
pub mod error;
pub mod generation;
pub mod logging;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod server;
