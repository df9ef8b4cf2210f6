//! Entity, create and update DTOs for every resource family the console
//! manages, bound to their REST paths through [`crm_core::Resource`].
//!
//! # Modules
//!
//! - [`leads`] — Prospective applicants captured from landing pages and referrals
//! - [`students`] — Applicants being processed through a visa workflow
//! - [`catalog`] — Countries, universities and courses
//! - [`visa`] — Visa types, workflows and workflow steps
//! - [`offerings`] — Scholarships and consultancy services
//! - [`content`] — FAQs, landing pages and messaging templates
//! - [`scheduling`] — Appointments and tasks
//! - [`dashboard`] — Aggregated counters for the overview page

pub mod catalog;
pub mod content;
pub mod dashboard;
pub mod leads;
pub mod offerings;
pub mod scheduling;
pub mod students;
pub mod visa;

pub use catalog::{Countries, Country, Course, Courses, Universities, University};
pub use content::{Faq, Faqs, LandingPage, LandingPages, MessageTemplate, Templates};
pub use dashboard::DashboardStats;
pub use leads::{Lead, Leads};
pub use offerings::{Scholarship, Scholarships, Service, Services};
pub use scheduling::{Appointment, Appointments, Task, Tasks};
pub use students::{Student, Students};
pub use visa::{Steps, VisaType, VisaTypes, Workflow, WorkflowStep, Workflows};
