//! Public-facing content (FAQs and landing pages) and the messaging
//! templates used for outbound email/SMS/WhatsApp.

use chrono::{DateTime, Utc};
use crm_core::validation::{FieldErrors, Validate};
use crm_core::{Module, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── FAQ ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFaq {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub is_published: bool,
}

impl Validate for CreateFaq {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .require("question", &self.question)
            .max_len("question", &self.question, 300)
            .require("answer", &self.answer);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFaq {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl Validate for UpdateFaq {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(q) = &self.question {
            errors.require("question", q).max_len("question", q, 300);
        }
        if let Some(a) = &self.answer {
            errors.require("answer", a);
        }
        errors.into_result()
    }
}

pub struct Faqs;

impl Resource for Faqs {
    const PATH: &'static str = "faqs";
    const LABEL: &'static str = "FAQ";
    const MODULE: Module = Module::Faqs;

    type Entity = Faq;
    type Create = CreateFaq;
    type Update = UpdateFaq;

    fn id(entity: &Faq) -> &str {
        &entity.id
    }
}

// ─── Landing Page ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LandingPage {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLandingPage {
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
}

impl Validate for CreateLandingPage {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", &self.title).slug("slug", &self.slug);
        if let Some(desc) = &self.seo_description {
            errors.max_len("seoDescription", desc, 160);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLandingPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PublishStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
}

impl Validate for UpdateLandingPage {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            errors.require("title", title);
        }
        if let Some(slug) = &self.slug {
            errors.slug("slug", slug);
        }
        if let Some(desc) = &self.seo_description {
            errors.max_len("seoDescription", desc, 160);
        }
        errors.into_result()
    }
}

pub struct LandingPages;

impl Resource for LandingPages {
    const PATH: &'static str = "landing-pages";
    const LABEL: &'static str = "Landing page";
    const MODULE: Module = Module::LandingPages;

    type Entity = LandingPage;
    type Create = CreateLandingPage;
    type Update = UpdateLandingPage;

    fn id(entity: &LandingPage) -> &str {
        &entity.id
    }
}

// ─── Messaging Template ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateChannel {
    #[default]
    Email,
    Sms,
    Whatsapp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub channel: TemplateChannel,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    /// Declared `{{variable}}` names.
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Local preview of a template with its variables substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: Option<String>,
    pub body: String,
}

impl MessageTemplate {
    /// Substitute declared variables; undeclared placeholders are left as-is
    /// and missing values render empty.
    pub fn render(&self, values: &HashMap<String, String>) -> RenderedMessage {
        RenderedMessage {
            subject: self
                .subject
                .as_ref()
                .map(|s| substitute(s, &self.variables, values)),
            body: substitute(&self.body, &self.variables, values),
        }
    }
}

fn substitute(text: &str, declared: &[String], values: &HashMap<String, String>) -> String {
    let mut result = text.to_string();
    for name in declared {
        let placeholder = format!("{{{{{}}}}}", name);
        let value = values.get(name).map(String::as_str).unwrap_or_default();
        result = result.replace(&placeholder, value);
    }
    result
}

/// Placeholders used in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim().to_string();
                if !name.is_empty() && !found.contains(&name) {
                    found.push(name);
                }
                rest = &after[end + 2..];
            }
            None => break,
        }
    }
    found
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplate {
    pub name: String,
    #[serde(default)]
    pub channel: TemplateChannel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

impl Validate for CreateTemplate {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name).require("body", &self.body);
        if self.channel == TemplateChannel::Email {
            match &self.subject {
                Some(subject) => {
                    errors.require("subject", subject);
                }
                None => errors.push("subject", "subject is required for email templates"),
            }
        }
        if self.channel == TemplateChannel::Sms {
            errors.max_len("body", &self.body, 1600);
        }
        let mut used = placeholders(&self.body);
        if let Some(subject) = &self.subject {
            used.extend(placeholders(subject));
        }
        for name in used {
            if !self.variables.contains(&name) {
                errors.push("variables", format!("placeholder {{{{{name}}}}} is not declared"));
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<TemplateChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateTemplate {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.require("name", name);
        }
        if let Some(body) = &self.body {
            errors.require("body", body);
        }
        errors.into_result()
    }
}

/// Body of `POST /templates/{id}/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTemplate {
    /// Email address or phone number, depending on the channel.
    pub recipient: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Validate for SendTemplate {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("recipient", &self.recipient);
        errors.into_result()
    }
}

pub struct Templates;

impl Resource for Templates {
    const PATH: &'static str = "templates";
    const LABEL: &'static str = "Template";
    const MODULE: Module = Module::Templates;

    type Entity = MessageTemplate;
    type Create = CreateTemplate;
    type Update = UpdateTemplate;

    fn id(entity: &MessageTemplate) -> &str {
        &entity.id
    }
}
