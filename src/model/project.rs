use crate::utils::cell_text;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The tab holding project metadata. It is not a project itself.
pub const META_SHEET: &str = "_PROJECTS";
pub const META_HEADER: [&str; 5] = ["project", "client", "status", "startDate", "progress"];

pub const DEFAULT_CLIENT: &str = "-";
pub const DEFAULT_STATUS: &str = "Planning";

/// One row of `_PROJECTS`. `project` is the tab name and the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub project: String,
    pub client: String,
    pub status: String,
    pub start_date: String,
    pub progress: f64,
}

impl ProjectMeta {
    /// Metadata for a tab that has no row yet.
    pub fn defaults(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            client: DEFAULT_CLIENT.to_string(),
            status: DEFAULT_STATUS.to_string(),
            start_date: String::new(),
            progress: 0.0,
        }
    }

    /// Reads a metadata row, filling blanks with defaults. Rows without a project name are skipped.
    pub fn from_row(row: &[Value]) -> Option<Self> {
        let project = cell_text(row.first());
        if project.is_empty() {
            return None;
        }
        let mut meta = Self::defaults(project);
        let client = cell_text(row.get(1));
        if !client.is_empty() {
            meta.client = client;
        }
        let status = cell_text(row.get(2));
        if !status.is_empty() {
            meta.status = status;
        }
        meta.start_date = cell_text(row.get(3));
        meta.progress = parse_progress(row.get(4));
        Some(meta)
    }

    /// The five cells A..E, all text, written with `RAW` input.
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::String(self.project.clone()),
            Value::String(self.client.clone()),
            Value::String(self.status.clone()),
            Value::String(self.start_date.clone()),
            Value::String(format_progress(self.progress)),
        ]
    }

    /// Applies the fields that are present in `update`.
    pub fn apply(&mut self, update: &ProjectFields) {
        if let Some(client) = non_blank(&update.client) {
            self.client = client;
        }
        if let Some(status) = non_blank(&update.status) {
            self.status = status;
        }
        if let Some(start_date) = &update.start_date {
            self.start_date = start_date.trim().to_string();
        }
        if update.progress.is_some() {
            self.progress = parse_progress(update.progress.as_ref());
        }
    }
}

/// Metadata fields as sent by a client. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub progress: Option<Value>,
}

/// A project as listed to clients: the tab plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub client: String,
    pub status: String,
    pub start_date: String,
    pub progress: f64,
}

impl From<ProjectMeta> for Project {
    fn from(meta: ProjectMeta) -> Self {
        Self {
            id: meta.project.clone(),
            name: meta.project,
            client: meta.client,
            status: meta.status,
            start_date: meta.start_date,
            progress: meta.progress,
        }
    }
}

pub fn header_row() -> Vec<Value> {
    META_HEADER
        .iter()
        .map(|h| Value::String(h.to_string()))
        .collect()
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers and numeric strings are clamped to 0..=100. Anything else is zero.
fn parse_progress(cell: Option<&Value>) -> f64 {
    let progress = match cell {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or_default(),
        _ => 0.0,
    };
    if progress.is_finite() {
        progress.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn format_progress(progress: f64) -> String {
    if progress.fract() == 0.0 {
        format!("{}", progress as i64)
    } else {
        progress.to_string()
    }
}
