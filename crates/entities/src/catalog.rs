//! Destination catalog: countries, universities and courses.
//!
//! Universities and courses are managed from the country pages, so all three
//! share the `countries` permission module.

use chrono::{DateTime, Utc};
use crm_core::validation::{FieldErrors, Validate};
use crm_core::{Module, Resource};
use serde::{Deserialize, Serialize};

// ─── Country ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: String,
    pub name: String,
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub flag_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn check_country_code(errors: &mut FieldErrors, code: &str) {
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        errors.push("code", "code must be a two-letter uppercase ISO code");
    }
}

fn check_currency(errors: &mut FieldErrors, currency: Option<&str>) {
    if let Some(c) = currency {
        if c.len() != 3 || !c.chars().all(|ch| ch.is_ascii_uppercase()) {
            errors.push("currency", "currency must be a three-letter ISO code");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCountry {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for CreateCountry {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name);
        check_country_code(&mut errors, &self.code);
        check_currency(&mut errors, self.currency.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCountry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateCountry {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.require("name", name);
        }
        if let Some(code) = &self.code {
            check_country_code(&mut errors, code);
        }
        check_currency(&mut errors, self.currency.as_deref());
        errors.into_result()
    }
}

pub struct Countries;

impl Resource for Countries {
    const PATH: &'static str = "countries";
    const LABEL: &'static str = "Country";
    const MODULE: Module = Module::Countries;

    type Entity = Country;
    type Create = CreateCountry;
    type Update = UpdateCountry;

    fn id(entity: &Country) -> &str {
        &entity.id
    }
}

// ─── University ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub id: String,
    pub name: String,
    pub country_id: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub ranking: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUniversity {
    pub name: String,
    pub country_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn check_website(errors: &mut FieldErrors, website: Option<&str>) {
    if let Some(site) = website {
        if url::Url::parse(site).is_err() {
            errors.push("website", "website must be an absolute URL");
        }
    }
}

impl Validate for CreateUniversity {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .require("name", &self.name)
            .require("countryId", &self.country_id);
        check_website(&mut errors, self.website.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUniversity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateUniversity {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.require("name", name);
        }
        check_website(&mut errors, self.website.as_deref());
        errors.into_result()
    }
}

pub struct Universities;

impl Resource for Universities {
    const PATH: &'static str = "universities";
    const LABEL: &'static str = "University";
    const MODULE: Module = Module::Countries;

    type Entity = University;
    type Create = CreateUniversity;
    type Update = UpdateUniversity;

    fn id(entity: &University) -> &str {
        &entity.id
    }
}

// ─── Course ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseLevel {
    Foundation,
    Diploma,
    #[default]
    Bachelor,
    Master,
    Doctorate,
    Certificate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub university_id: String,
    #[serde(default)]
    pub level: CourseLevel,
    #[serde(default)]
    pub duration_months: Option<u32>,
    #[serde(default)]
    pub tuition_fee: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Intake months, e.g. `["SEPTEMBER", "JANUARY"]`.
    #[serde(default)]
    pub intakes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    pub name: String,
    pub university_id: String,
    #[serde(default)]
    pub level: CourseLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuition_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intakes: Vec<String>,
}

impl Validate for CreateCourse {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .require("name", &self.name)
            .require("universityId", &self.university_id)
            .non_negative("tuitionFee", self.tuition_fee);
        check_currency(&mut errors, self.currency.as_deref());
        if self.duration_months == Some(0) {
            errors.push("durationMonths", "durationMonths must be at least 1");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuition_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intakes: Option<Vec<String>>,
}

impl Validate for UpdateCourse {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.require("name", name);
        }
        errors.non_negative("tuitionFee", self.tuition_fee);
        check_currency(&mut errors, self.currency.as_deref());
        errors.into_result()
    }
}

pub struct Courses;

impl Resource for Courses {
    const PATH: &'static str = "courses";
    const LABEL: &'static str = "Course";
    const MODULE: Module = Module::Countries;

    type Entity = Course;
    type Create = CreateCourse;
    type Update = UpdateCourse;

    fn id(entity: &Course) -> &str {
        &entity.id
    }
}
