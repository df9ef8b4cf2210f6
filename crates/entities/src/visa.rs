//! Visa types and the document/processing workflows attached to them.

use chrono::{DateTime, Utc};
use crm_core::validation::{FieldErrors, Validate};
use crm_core::{Module, Resource};
use serde::{Deserialize, Serialize};

// ─── Visa Type ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisaType {
    pub id: String,
    pub name: String,
    pub country_id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub processing_time_days: Option<u32>,
    #[serde(default)]
    pub fee: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisaType {
    pub name: String,
    pub country_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

impl Validate for CreateVisaType {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .require("name", &self.name)
            .require("countryId", &self.country_id)
            .non_negative("fee", self.fee);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVisaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateVisaType {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.require("name", name);
        }
        errors.non_negative("fee", self.fee);
        errors.into_result()
    }
}

pub struct VisaTypes;

impl Resource for VisaTypes {
    const PATH: &'static str = "visa-types";
    const LABEL: &'static str = "Visa type";
    const MODULE: Module = Module::VisaTypes;

    type Entity = VisaType;
    type Create = CreateVisaType;
    type Update = UpdateVisaType;

    fn id(entity: &VisaType) -> &str {
        &entity.id
    }
}

// ─── Workflow ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visa_type_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Steps in execution order.
    pub fn ordered_steps(&self) -> Vec<&WorkflowStep> {
        let mut steps: Vec<&WorkflowStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// The step after `step_id`, or the first step when `step_id` is `None`.
    pub fn next_step(&self, step_id: Option<&str>) -> Option<&WorkflowStep> {
        let steps = self.ordered_steps();
        match step_id {
            None => steps.first().copied(),
            Some(current) => {
                let pos = steps.iter().position(|s| s.id == current)?;
                steps.get(pos + 1).copied()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visa_type_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for CreateWorkflow {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name).max_len("name", &self.name, 120);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visa_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateWorkflow {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.require("name", name).max_len("name", name, 120);
        }
        errors.into_result()
    }
}

pub struct Workflows;

impl Resource for Workflows {
    const PATH: &'static str = "workflows";
    const LABEL: &'static str = "Workflow";
    const MODULE: Module = Module::Workflows;

    type Entity = Workflow;
    type Create = CreateWorkflow;
    type Update = UpdateWorkflow;

    fn id(entity: &Workflow) -> &str {
        &entity.id
    }
}

// ─── Workflow Step ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: u32,
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub estimated_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowStep {
    pub workflow_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_documents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<u32>,
}

impl Validate for CreateWorkflowStep {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .require("workflowId", &self.workflow_id)
            .require("name", &self.name);
        if self.required_documents.iter().any(|d| d.trim().is_empty()) {
            errors.push("requiredDocuments", "requiredDocuments must not contain blank entries");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_documents: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<u32>,
}

impl Validate for UpdateWorkflowStep {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.require("name", name);
        }
        errors.into_result()
    }
}

pub struct Steps;

impl Resource for Steps {
    const PATH: &'static str = "steps";
    const LABEL: &'static str = "Workflow step";
    const MODULE: Module = Module::Workflows;

    type Entity = WorkflowStep;
    type Create = CreateWorkflowStep;
    type Update = UpdateWorkflowStep;

    fn id(entity: &WorkflowStep) -> &str {
        &entity.id
    }
}
