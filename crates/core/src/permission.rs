//! Permission vocabulary: the modules a session can be scoped to and the
//! actions it may perform on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A console module. Wire form is kebab-case (`landing-pages`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    Dashboard,
    Leads,
    Students,
    Countries,
    Appointments,
    Workflows,
    Tasks,
    Scholarships,
    Services,
    Blogs,
    Messaging,
    Templates,
    Users,
    Roles,
    Files,
    LandingPages,
    Faqs,
    VisaTypes,
}

impl Module {
    /// All module variants.
    pub fn all() -> Vec<Module> {
        vec![
            Module::Dashboard,
            Module::Leads,
            Module::Students,
            Module::Countries,
            Module::Appointments,
            Module::Workflows,
            Module::Tasks,
            Module::Scholarships,
            Module::Services,
            Module::Blogs,
            Module::Messaging,
            Module::Templates,
            Module::Users,
            Module::Roles,
            Module::Files,
            Module::LandingPages,
            Module::Faqs,
            Module::VisaTypes,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Leads => "leads",
            Module::Students => "students",
            Module::Countries => "countries",
            Module::Appointments => "appointments",
            Module::Workflows => "workflows",
            Module::Tasks => "tasks",
            Module::Scholarships => "scholarships",
            Module::Services => "services",
            Module::Blogs => "blogs",
            Module::Messaging => "messaging",
            Module::Templates => "templates",
            Module::Users => "users",
            Module::Roles => "roles",
            Module::Files => "files",
            Module::LandingPages => "landing-pages",
            Module::Faqs => "faqs",
            Module::VisaTypes => "visa-types",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Module::all()
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// An action on a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Assign,
    Cancel,
    Complete,
    Convert,
    Export,
    Publish,
    Send,
    Download,
    Execute,
}

impl Action {
    /// All action variants.
    pub fn all() -> Vec<Action> {
        vec![
            Action::Create,
            Action::Read,
            Action::Update,
            Action::Delete,
            Action::Assign,
            Action::Cancel,
            Action::Complete,
            Action::Convert,
            Action::Export,
            Action::Publish,
            Action::Send,
            Action::Download,
            Action::Execute,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Assign => "assign",
            Action::Cancel => "cancel",
            Action::Complete => "complete",
            Action::Convert => "convert",
            Action::Export => "export",
            Action::Publish => "publish",
            Action::Send => "send",
            Action::Download => "download",
            Action::Execute => "execute",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Action::all()
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName(pub String);

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown name '{}'", self.0)
    }
}

impl std::error::Error for UnknownName {}

/// Parse a `"<module>:<action>"` permission string.
pub fn parse_permission(raw: &str) -> Option<(Module, Action)> {
    let (module, action) = raw.split_once(':')?;
    Some((module.parse().ok()?, action.parse().ok()?))
}

/// Inverse of [`parse_permission`].
pub fn format_permission(module: Module, action: Action) -> String {
    format!("{}:{}", module.as_str(), action.as_str())
}
