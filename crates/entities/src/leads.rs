//! Leads: prospective applicants before they sign up for a service.

use chrono::{DateTime, Utc};
use crm_core::validation::{FieldErrors, Validate};
use crm_core::{Module, Resource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub source: LeadSource,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub interested_country_id: Option<String>,
    #[serde(default)]
    pub interested_service_id: Option<String>,
    #[serde(default)]
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Converted and lost leads can no longer be converted.
    pub fn is_open(&self) -> bool {
        !matches!(self.status, LeadStatus::Converted | LeadStatus::Lost)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    #[default]
    Website,
    LandingPage,
    Referral,
    SocialMedia,
    WalkIn,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLead {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub source: LeadSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interested_country_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interested_service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for CreateLead {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .require("firstName", &self.first_name)
            .require("lastName", &self.last_name)
            .require("email", &self.email)
            .email("email", &self.email)
            .require("phone", &self.phone)
            .max_len("phone", &self.phone, 32);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLead {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<LeadSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interested_country_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interested_service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for UpdateLead {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(first) = &self.first_name {
            errors.require("firstName", first);
        }
        if let Some(last) = &self.last_name {
            errors.require("lastName", last);
        }
        if let Some(email) = &self.email {
            errors.require("email", email).email("email", email);
        }
        if let Some(phone) = &self.phone {
            errors.require("phone", phone).max_len("phone", phone, 32);
        }
        errors.into_result()
    }
}

/// Body of `POST /leads/{id}/convert`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLead {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visa_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

impl Validate for ConvertLead {
    fn validate(&self) -> Result<(), FieldErrors> {
        Ok(())
    }
}

pub struct Leads;

impl Resource for Leads {
    const PATH: &'static str = "leads";
    const LABEL: &'static str = "Lead";
    const MODULE: Module = Module::Leads;

    type Entity = Lead;
    type Create = CreateLead;
    type Update = UpdateLead;

    fn id(entity: &Lead) -> &str {
        &entity.id
    }
}
