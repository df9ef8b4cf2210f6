//! Sidebar navigation filtered by read access.

use crate::gate::{GateDecision, PermissionGate};
use crate::permissions::PermissionState;
use crm_core::Module;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub label: &'static str,
    pub href: &'static str,
    /// `None` for pages with no module scoping; those are always shown.
    pub module: Option<Module>,
}

const fn entry(label: &'static str, href: &'static str, module: Option<Module>) -> NavEntry {
    NavEntry { label, href, module }
}

pub const MENU: &[NavEntry] = &[
    entry("Overview", "/dashboard", None),
    entry("Leads", "/dashboard/leads", Some(Module::Leads)),
    entry("Students", "/dashboard/students", Some(Module::Students)),
    entry("Countries", "/dashboard/countries", Some(Module::Countries)),
    entry("Visa Types", "/dashboard/visa-types", Some(Module::VisaTypes)),
    entry("Workflow", "/dashboard/workflows", Some(Module::Workflows)),
    entry("Scholarships", "/dashboard/scholarships", Some(Module::Scholarships)),
    entry("Services", "/dashboard/services", Some(Module::Services)),
    entry("FAQs", "/dashboard/faqs", Some(Module::Faqs)),
    entry("Landing Pages", "/dashboard/landing-pages", Some(Module::LandingPages)),
    entry("Appointments", "/dashboard/appointments", Some(Module::Appointments)),
    entry("Tasks", "/dashboard/tasks", Some(Module::Tasks)),
    entry("Templates", "/dashboard/templates", Some(Module::Templates)),
    entry("Users", "/dashboard/users", Some(Module::Users)),
    entry("Roles", "/dashboard/roles", Some(Module::Roles)),
    entry("Settings", "/dashboard/settings", None),
];

/// Menu entries the session may see, in menu order. Scoped entries appear
/// only once `(module, read)` is known to be granted.
pub fn visible_entries(state: &PermissionState) -> Vec<&'static NavEntry> {
    MENU.iter()
        .filter(|entry| match entry.module {
            None => true,
            Some(module) => PermissionGate::read(module).decide(state) == GateDecision::Allow,
        })
        .collect()
}
