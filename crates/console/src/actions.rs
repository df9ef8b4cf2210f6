//! Domain actions beyond CRUD. Each is refused locally unless the session
//! holds the matching `(module, action)` grant, then runs through the
//! mutation pipeline like any other write.

use crate::gate::{GateDecision, PermissionGate};
use crate::mutation::{Mutation, MutationRunner};
use crate::permissions::SessionContext;
use crm_client::ApiClient;
use crm_core::permission::format_permission;
use crm_core::types::Ack;
use crm_core::{Action, CrmError, CrmResult, Module, Resource};
use crm_entities::content::{LandingPage, LandingPages, SendTemplate, Templates};
use crm_entities::leads::{ConvertLead, Leads};
use crm_entities::scheduling::{Appointment, Appointments, CancelAppointment, Task, Tasks};
use crm_entities::students::{Student, Students};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub struct DomainActions {
    client: ApiClient,
    runner: Arc<MutationRunner>,
    session: Arc<SessionContext>,
}

impl DomainActions {
    pub fn new(client: ApiClient, runner: Arc<MutationRunner>, session: Arc<SessionContext>) -> Self {
        Self {
            client,
            runner,
            session,
        }
    }

    fn authorize(&self, module: Module, action: Action) -> CrmResult<()> {
        match PermissionGate::new(module, action).decide(&self.session.state()) {
            GateDecision::Allow => Ok(()),
            decision => {
                let permission = format_permission(module, action);
                debug!(permission = %permission, ?decision, "Action refused");
                Err(CrmError::Forbidden(permission))
            }
        }
    }

    /// `POST /leads/{id}/convert`: turn a lead into a student.
    pub async fn convert_lead(&self, lead_id: &str, input: &ConvertLead) -> CrmResult<Student> {
        self.authorize(Module::Leads, Action::Convert)?;
        let mutation = Mutation::new(Leads::PATH, "Lead converted to student").also_invalidates(Students::PATH);
        self.runner
            .submit(mutation, input, self.client.action::<Leads, _, Student>(lead_id, "convert", input))
            .await
    }

    pub async fn cancel_appointment(&self, id: &str, input: &CancelAppointment) -> CrmResult<Appointment> {
        self.authorize(Module::Appointments, Action::Cancel)?;
        let mutation = Mutation::new(Appointments::PATH, "Appointment cancelled");
        self.runner
            .submit(mutation, input, self.client.action::<Appointments, _, Appointment>(id, "cancel", input))
            .await
    }

    pub async fn complete_appointment(&self, id: &str) -> CrmResult<Appointment> {
        self.authorize(Module::Appointments, Action::Complete)?;
        let mutation = Mutation::new(Appointments::PATH, "Appointment completed");
        self.runner
            .execute(mutation, self.client.action::<Appointments, _, Appointment>(id, "complete", &json!({})))
            .await
    }

    pub async fn complete_task(&self, id: &str) -> CrmResult<Task> {
        self.authorize(Module::Tasks, Action::Complete)?;
        let mutation = Mutation::new(Tasks::PATH, "Task completed");
        self.runner
            .execute(mutation, self.client.action::<Tasks, _, Task>(id, "complete", &json!({})))
            .await
    }

    pub async fn publish_landing_page(&self, id: &str) -> CrmResult<LandingPage> {
        self.authorize(Module::LandingPages, Action::Publish)?;
        let mutation = Mutation::new(LandingPages::PATH, "Landing page published");
        self.runner
            .execute(mutation, self.client.action::<LandingPages, _, LandingPage>(id, "publish", &json!({})))
            .await
    }

    /// `POST /templates/{id}/send`: render and deliver a template to one
    /// recipient.
    pub async fn send_template(&self, id: &str, input: &SendTemplate) -> CrmResult<Ack> {
        self.authorize(Module::Templates, Action::Send)?;
        let mutation = Mutation::new(Templates::PATH, "Message sent");
        self.runner
            .submit(mutation, input, self.client.action::<Templates, _, Ack>(id, "send", input))
            .await
    }
}
