//! Project CRUD. A project is a tab of the spreadsheet; its metadata lives in one row of the
//! `_PROJECTS` tab, which is created the first time it is needed.

use crate::api::{Input, Render, Sheet, Tab};
use crate::error::{ErrorType, IntoResult, Result};
use crate::model::a1;
use crate::model::{header_row, Project, ProjectFields, ProjectMeta, META_SHEET};
use crate::utils::cell_text;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A project to create.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: ProjectFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectList {
    pub data: Vec<Project>,
    /// Tab names, in sheet order.
    pub projects: Vec<String>,
}

pub struct Projects {
    sheet: Arc<dyn Sheet>,
}

impl Projects {
    pub fn new(sheet: Arc<dyn Sheet>) -> Self {
        Self { sheet }
    }

    /// Every tab except `_PROJECTS`, with its metadata or the defaults.
    pub async fn list(&self) -> Result<ProjectList> {
        let tabs = self.ensure_meta_sheet().await?;
        let projects = project_titles(&tabs);
        let metas: HashMap<String, ProjectMeta> = self
            .read_meta()
            .await?
            .into_iter()
            .map(|(_, meta)| (meta.project.clone(), meta))
            .collect();
        let data = projects
            .iter()
            .map(|name| {
                metas
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| ProjectMeta::defaults(name.clone()))
                    .into()
            })
            .collect();
        Ok(ProjectList { data, projects })
    }

    /// Creates the tab and appends its metadata row.
    pub async fn create(&self, project: NewProject) -> Result<ProjectMeta> {
        let name = project.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::msg(ErrorType::Request, "name is required"));
        }
        if name == META_SHEET {
            return Err(Error::msg(
                ErrorType::Request,
                format!("'{META_SHEET}' cannot be used as a project name"),
            ));
        }
        let tabs = self.ensure_meta_sheet().await?;
        if tabs.iter().any(|t| t.title == name) {
            return Err(Error::msg(
                ErrorType::Conflict,
                format!("A project or tab named '{name}' already exists"),
            ));
        }

        self.sheet
            .add_tab(name)
            .await
            .pub_result(ErrorType::Service)?;
        let mut meta = ProjectMeta::defaults(name);
        meta.apply(&project.fields);
        self.sheet
            .append(
                &a1::range(META_SHEET, "A:E"),
                vec![meta.to_row()],
                Input::Raw,
            )
            .await
            .pub_result(ErrorType::Service)?;
        info!("Created project '{name}'");
        Ok(meta)
    }

    /// Updates the metadata of an existing project tab. A tab without a metadata row gets one.
    pub async fn update(&self, name: &str, fields: ProjectFields) -> Result<ProjectMeta> {
        let name = name.trim();
        let tabs = self.ensure_meta_sheet().await?;
        if name == META_SHEET || !tabs.iter().any(|t| t.title == name) {
            return Err(not_found(name));
        }

        let existing = self
            .read_meta()
            .await?
            .into_iter()
            .find(|(_, meta)| meta.project == name);
        match existing {
            Some((row, mut meta)) => {
                meta.apply(&fields);
                self.sheet
                    .update(
                        &a1::range(META_SHEET, format!("A{row}:E{row}")),
                        vec![meta.to_row()],
                        Input::Raw,
                    )
                    .await
                    .pub_result(ErrorType::Service)?;
                info!("Updated project '{name}' in row {row}");
                Ok(meta)
            }
            None => {
                let mut meta = ProjectMeta::defaults(name);
                meta.apply(&fields);
                self.sheet
                    .append(
                        &a1::range(META_SHEET, "A:E"),
                        vec![meta.to_row()],
                        Input::Raw,
                    )
                    .await
                    .pub_result(ErrorType::Service)?;
                info!("Added metadata for project '{name}'");
                Ok(meta)
            }
        }
    }

    /// Deletes the tab, then rewrites `_PROJECTS` without the project's rows in a single write.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::msg(ErrorType::Request, "name is required"));
        }
        let tabs = self.ensure_meta_sheet().await?;
        let tab = tabs
            .iter()
            .find(|t| t.title == name && t.title != META_SHEET)
            .ok_or_else(|| not_found(name))?;

        self.sheet
            .delete_tab(tab.id)
            .await
            .pub_result(ErrorType::Service)?;

        let range = a1::range(META_SHEET, "A1:E");
        let all = self
            .sheet
            .get(&range, Render::Formatted)
            .await
            .pub_result(ErrorType::Service)?;
        let mut kept = Vec::with_capacity(all.len());
        kept.push(
            all.first()
                .filter(|row| !row.is_empty())
                .cloned()
                .unwrap_or_else(header_row),
        );
        kept.extend(
            all.iter()
                .skip(1)
                .filter(|row| cell_text(row.first()) != name)
                .cloned(),
        );
        // Blank rows overwrite what the kept rows no longer cover, so one write replaces the
        // whole table.
        let blank = vec![Value::String(String::new()); header_row().len()];
        kept.resize(all.len().max(kept.len()), blank);
        debug!("Rewriting {range} with {} rows", kept.len());
        self.sheet
            .update(&range, kept, Input::Raw)
            .await
            .pub_result(ErrorType::Service)?;
        info!("Deleted project '{name}'");
        Ok(())
    }

    /// Creates `_PROJECTS` with its header when missing. Returns the tabs as they are afterwards.
    async fn ensure_meta_sheet(&self) -> Result<Vec<Tab>> {
        let mut tabs = self.sheet.tabs().await.pub_result(ErrorType::Service)?;
        if tabs.iter().any(|t| t.title == META_SHEET) {
            return Ok(tabs);
        }
        info!("Creating the {META_SHEET} tab");
        let tab = self
            .sheet
            .add_tab(META_SHEET)
            .await
            .pub_result(ErrorType::Service)?;
        self.sheet
            .update(
                &a1::range(META_SHEET, "A1:E1"),
                vec![header_row()],
                Input::Raw,
            )
            .await
            .pub_result(ErrorType::Service)?;
        tabs.push(tab);
        Ok(tabs)
    }

    /// Metadata rows with their one-based sheet row.
    async fn read_meta(&self) -> Result<Vec<(usize, ProjectMeta)>> {
        let rows = self
            .sheet
            .get(&a1::range(META_SHEET, "A2:E"), Render::Formatted)
            .await
            .pub_result(ErrorType::Service)?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(ix, row)| ProjectMeta::from_row(row).map(|meta| (ix + 2, meta)))
            .collect())
    }
}

fn project_titles(tabs: &[Tab]) -> Vec<String> {
    tabs.iter()
        .filter(|t| t.title != META_SHEET)
        .map(|t| t.title.clone())
        .collect()
}

fn not_found(name: &str) -> Error {
    Error::msg(ErrorType::NotFound, format!("Project '{name}' was not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CopiedFile, Grid, TestSheet};
    use crate::error::Res;
    use serde_json::json;

    fn projects() -> (Arc<TestSheet>, Projects) {
        let sheet = Arc::new(TestSheet::default());
        (sheet.clone(), Projects::new(sheet))
    }

    fn new_project(name: &str) -> NewProject {
        NewProject {
            name: Some(name.to_string()),
            fields: ProjectFields {
                client: Some("Bu Sari".to_string()),
                progress: Some(json!(10)),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_list_with_defaults() {
        let (_, projects) = projects();
        let list = projects.list().await.unwrap();
        assert_eq!(
            list.projects,
            vec!["Sheet1", "Renovasi Rumah Budi", "Kantor PT Maju"]
        );
        let budi = &list.data[1];
        assert_eq!(budi.id, "Renovasi Rumah Budi");
        assert_eq!(budi.client, "Pak Budi");
        assert_eq!(budi.status, "Ongoing");
        assert_eq!(budi.start_date, "2025-10-01");
        assert_eq!(budi.progress, 40.0);
        let kantor = &list.data[2];
        assert_eq!(kantor.client, "-");
        assert_eq!(kantor.status, "Planning");
        assert_eq!(kantor.start_date, "");
        assert_eq!(kantor.progress, 0.0);
    }

    #[tokio::test]
    async fn test_meta_sheet_is_created_lazily() {
        let sheet = Arc::new(TestSheet::new(vec![("P".to_string(), Vec::new())]));
        let projects = Projects::new(sheet.clone());
        let list = projects.list().await.unwrap();
        assert_eq!(list.projects, vec!["P"]);
        let header = sheet
            .get("'_PROJECTS'!A1:E1", Render::Value)
            .await
            .unwrap();
        assert_eq!(header, vec![header_row()]);
    }

    #[tokio::test]
    async fn test_create() {
        let (sheet, projects) = projects();
        let meta = projects.create(new_project(" Dapur Bu Sari ")).await.unwrap();
        assert_eq!(meta.project, "Dapur Bu Sari");
        assert_eq!(meta.status, "Planning");

        let row = sheet
            .get("'_PROJECTS'!A3:E3", Render::Value)
            .await
            .unwrap();
        assert_eq!(
            row,
            vec![vec![
                json!("Dapur Bu Sari"),
                json!("Bu Sari"),
                json!("Planning"),
                json!(""),
                json!("10")
            ]]
        );
        let list = projects.list().await.unwrap();
        assert!(list.projects.contains(&"Dapur Bu Sari".to_string()));
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let (_, projects) = projects();
        let err = projects.create(new_project("  ")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        let err = projects.create(new_project(META_SHEET)).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        let err = projects
            .create(new_project("Kantor PT Maju"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Conflict);
    }

    #[tokio::test]
    async fn test_update() {
        let (_, projects) = projects();
        let fields = ProjectFields {
            status: Some("Done".to_string()),
            progress: Some(json!("100")),
            ..Default::default()
        };
        let meta = projects
            .update("Renovasi Rumah Budi", fields.clone())
            .await
            .unwrap();
        assert_eq!(meta.client, "Pak Budi");
        assert_eq!(meta.status, "Done");
        assert_eq!(meta.progress, 100.0);

        // No metadata row yet: one is appended.
        let meta = projects.update("Kantor PT Maju", fields).await.unwrap();
        assert_eq!(meta.client, "-");
        let list = projects.list().await.unwrap();
        assert_eq!(list.data[1].status, "Done");
        assert_eq!(list.data[2].status, "Done");
        assert_eq!(list.data[2].progress, 100.0);

        let err = projects
            .update("Nope", ProjectFields::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_delete() {
        let (sheet, projects) = projects();
        projects.create(new_project("Dapur Bu Sari")).await.unwrap();
        projects.delete("Renovasi Rumah Budi").await.unwrap();

        let list = projects.list().await.unwrap();
        assert_eq!(list.projects, vec!["Sheet1", "Kantor PT Maju", "Dapur Bu Sari"]);
        let meta = sheet
            .get("'_PROJECTS'!A1:A", Render::Value)
            .await
            .unwrap();
        assert_eq!(meta, vec![vec![json!("project")], vec![json!("Dapur Bu Sari")]]);

        let err = projects.delete("Renovasi Rumah Budi").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
        let err = projects.delete(META_SHEET).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }

    /// Delegates to a `TestSheet` but refuses to rewrite the whole `_PROJECTS` table.
    struct RewriteFails(Arc<TestSheet>);

    #[async_trait::async_trait]
    impl Sheet for RewriteFails {
        async fn get(&self, range: &str, render: Render) -> Res<Grid> {
            self.0.get(range, render).await
        }
        async fn batch_get(&self, ranges: &[String], render: Render) -> Res<Vec<Grid>> {
            self.0.batch_get(ranges, render).await
        }
        async fn update(&self, range: &str, values: Grid, input: Input) -> Res<()> {
            if range == a1::range(META_SHEET, "A1:E") {
                anyhow::bail!("quota exceeded");
            }
            self.0.update(range, values, input).await
        }
        async fn append(&self, range: &str, values: Grid, input: Input) -> Res<Value> {
            self.0.append(range, values, input).await
        }
        async fn clear(&self, range: &str) -> Res<()> {
            self.0.clear(range).await
        }
        async fn tabs(&self) -> Res<Vec<Tab>> {
            self.0.tabs().await
        }
        async fn add_tab(&self, title: &str) -> Res<Tab> {
            self.0.add_tab(title).await
        }
        async fn delete_tab(&self, id: i64) -> Res<()> {
            self.0.delete_tab(id).await
        }
        async fn copy_spreadsheet(&self, name: &str, folder_id: &str) -> Res<CopiedFile> {
            self.0.copy_spreadsheet(name, folder_id).await
        }
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_other_metadata() {
        let inner = Arc::new(TestSheet::default());
        let projects = Projects::new(Arc::new(RewriteFails(inner.clone())));
        projects.create(new_project("Dapur Bu Sari")).await.unwrap();
        let before = inner
            .get("'_PROJECTS'!A1:E", Render::Formatted)
            .await
            .unwrap();

        let err = projects.delete("Renovasi Rumah Budi").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Service);

        let after = inner
            .get("'_PROJECTS'!A1:E", Render::Formatted)
            .await
            .unwrap();
        assert_eq!(after, before);
        let list = projects.list().await.unwrap();
        let dapur = list.data.iter().find(|p| p.id == "Dapur Bu Sari").unwrap();
        assert_eq!(dapur.client, "Bu Sari");
    }
}
