//! Counselling appointments and staff tasks.

use chrono::{DateTime, Utc};
use crm_core::validation::{FieldErrors, Validate};
use crm_core::{Module, Resource};
use serde::{Deserialize, Serialize};

// ─── Appointment ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentMode {
    #[default]
    InPerson,
    Video,
    Phone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub mode: AppointmentMode,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Only scheduled appointments may be cancelled or completed.
    pub fn is_actionable(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    pub fn overlaps(&self, other: &Appointment) -> bool {
        self.starts_at < other.ends_at && other.starts_at < self.ends_at
    }
}

fn check_window(
    errors: &mut FieldErrors,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if end <= start {
            errors.push("endsAt", "endsAt must be after startsAt");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointment {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub mode: AppointmentMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for CreateAppointment {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("title", &self.title);
        check_window(&mut errors, Some(self.starts_at), Some(self.ends_at));
        if self.student_id.is_none() && self.lead_id.is_none() {
            errors.push("studentId", "an appointment needs a student or a lead");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AppointmentMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for UpdateAppointment {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            errors.require("title", title);
        }
        check_window(&mut errors, self.starts_at, self.ends_at);
        errors.into_result()
    }
}

/// Body of `POST /appointments/{id}/cancel`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validate for CancelAppointment {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(reason) = &self.reason {
            errors.max_len("reason", reason, 500);
        }
        errors.into_result()
    }
}

pub struct Appointments;

impl Resource for Appointments {
    const PATH: &'static str = "appointments";
    const LABEL: &'static str = "Appointment";
    const MODULE: Module = Module::Appointments;

    type Entity = Appointment;
    type Create = CreateAppointment;
    type Update = UpdateAppointment;

    fn id(entity: &Appointment) -> &str {
        &entity.id
    }
}

// ─── Task ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, TaskStatus::Todo | TaskStatus::InProgress)
            && self.due_date.is_some_and(|due| due < now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
}

impl Validate for CreateTask {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors
            .require("title", &self.title)
            .max_len("title", &self.title, 200);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
}

impl Validate for UpdateTask {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            errors.require("title", title).max_len("title", title, 200);
        }
        errors.into_result()
    }
}

pub struct Tasks;

impl Resource for Tasks {
    const PATH: &'static str = "tasks";
    const LABEL: &'static str = "Task";
    const MODULE: Module = Module::Tasks;

    type Entity = Task;
    type Create = CreateTask;
    type Update = UpdateTask;

    fn id(entity: &Task) -> &str {
        &entity.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn appointment(start_offset_mins: i64, len_mins: i64) -> Appointment {
        let base = DateTime::parse_from_rfc3339("2026-04-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let starts_at = base + Duration::minutes(start_offset_mins);
        Appointment {
            id: format!("a{start_offset_mins}"),
            title: "Counselling".into(),
            starts_at,
            ends_at: starts_at + Duration::minutes(len_mins),
            status: AppointmentStatus::Scheduled,
            mode: AppointmentMode::Video,
            student_id: Some("s1".into()),
            lead_id: None,
            assigned_to_id: None,
            location: None,
            notes: None,
            created_at: base,
            updated_at: base,
        }
    }

    #[test]
    fn test_overlap() {
        let a = appointment(0, 60);
        assert!(a.overlaps(&appointment(30, 60)));
        assert!(!a.overlaps(&appointment(60, 30)));
    }

    #[test]
    fn test_window_must_be_positive() {
        let now = Utc::now();
        let create = CreateAppointment {
            title: "Visa interview prep".into(),
            starts_at: now,
            ends_at: now,
            mode: AppointmentMode::InPerson,
            student_id: None,
            lead_id: None,
            assigned_to_id: None,
            location: None,
            notes: None,
        };
        let errors = create.validate().unwrap_err();
        assert!(errors.for_field("endsAt").is_some());
        assert!(errors.for_field("studentId").is_some());
    }

    #[test]
    fn test_task_overdue_only_when_open() {
        let now = Utc::now();
        let mut task = Task {
            id: "t1".into(),
            title: "Collect bank statements".into(),
            description: None,
            due_date: Some(now - Duration::hours(1)),
            priority: TaskPriority::High,
            status: TaskStatus::Todo,
            assigned_to_id: None,
            student_id: Some("s1".into()),
            lead_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(task.is_overdue(now));
        task.status = TaskStatus::Done;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::Urgent > TaskPriority::High);
        assert!(TaskPriority::Low < TaskPriority::Medium);
    }
}
