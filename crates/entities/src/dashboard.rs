//! Aggregated counters returned by `GET /dashboard/stats`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_leads: u64,
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub total_appointments: u64,
    #[serde(default)]
    pub upcoming_appointments: u64,
    #[serde(default)]
    pub pending_tasks: u64,
    #[serde(default)]
    pub leads_by_status: BTreeMap<String, u64>,
    #[serde(default)]
    pub students_by_status: BTreeMap<String, u64>,
}

impl DashboardStats {
    /// Share of leads that reached `CONVERTED`, in percent.
    pub fn conversion_rate(&self) -> f64 {
        if self.total_leads == 0 {
            return 0.0;
        }
        let converted = self.leads_by_status.get("CONVERTED").copied().unwrap_or(0);
        converted as f64 / self.total_leads as f64 * 100.0
    }
}
