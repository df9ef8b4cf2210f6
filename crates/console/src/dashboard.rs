//! Overview page: headline counters, each shown only to sessions that may
//! read the module it summarises.

use crate::gate::PermissionGate;
use crate::permissions::PermissionState;
use crate::resources::LoadState;
use crm_client::ApiClient;
use crm_core::Module;
use crm_entities::dashboard::DashboardStats;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewCard {
    pub label: &'static str,
    pub value: u64,
    pub module: Module,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub cards: Vec<OverviewCard>,
    /// Present only with lead read access.
    pub conversion_rate: Option<f64>,
    pub leads_by_status: BTreeMap<String, u64>,
    pub students_by_status: BTreeMap<String, u64>,
}

impl Overview {
    pub fn build(stats: &DashboardStats, state: &PermissionState) -> Self {
        let readable = |module| PermissionGate::read(module).render(state, || ()).is_some();

        let candidates = [
            ("Total leads", stats.total_leads, Module::Leads),
            ("Students", stats.total_students, Module::Students),
            ("Appointments", stats.total_appointments, Module::Appointments),
            ("Upcoming appointments", stats.upcoming_appointments, Module::Appointments),
            ("Pending tasks", stats.pending_tasks, Module::Tasks),
        ];
        let cards = candidates
            .into_iter()
            .filter(|(_, _, module)| readable(*module))
            .map(|(label, value, module)| OverviewCard { label, value, module })
            .collect();

        let leads = readable(Module::Leads);
        Self {
            cards,
            conversion_rate: leads.then(|| stats.conversion_rate()),
            leads_by_status: if leads { stats.leads_by_status.clone() } else { BTreeMap::new() },
            students_by_status: if readable(Module::Students) {
                stats.students_by_status.clone()
            } else {
                BTreeMap::new()
            },
        }
    }

    pub fn card(&self, label: &str) -> Option<&OverviewCard> {
        self.cards.iter().find(|c| c.label == label)
    }
}

/// Fetch `GET /dashboard/stats` and shape it for the session.
pub async fn load_overview(client: &ApiClient, state: &PermissionState) -> LoadState<Overview> {
    match client.dashboard_stats().await {
        Ok(stats) => LoadState::Loaded(Overview::build(&stats, state)),
        Err(e) => {
            warn!(error = %e, "Failed to load dashboard stats");
            LoadState::Failed(e.user_message())
        }
    }
}
