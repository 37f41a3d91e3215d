use crate::auth::{Claims, Login, Session};
use crate::dashboard::OverviewReply;
use crate::error::ErrorType;
use crate::ledger::{CashoutList, CashoutRequest, CashoutSummary, CashoutWritten};
use crate::model::{ProjectFields, ProjectMeta};
use crate::projects::{NewProject, ProjectList};
use crate::rekap::{Appended, RekapRows};
use crate::server::bearer::Bearer;
use crate::server::response::{json_body, NoBody, Success};
use crate::server::AppState;
use crate::{Error, Result};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) async fn health() -> &'static str {
    "Konstruktor backend is running"
}

pub(super) async fn login(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Login>, JsonRejection>,
) -> Result<Success<Session>> {
    let login = json_body(body)?;
    state.auth.login(&login).map(Success::new)
}

#[derive(Serialize)]
pub(super) struct Me {
    user: Claims,
}

pub(super) async fn me(Bearer(claims): Bearer) -> Success<Me> {
    Success::new(Me { user: claims })
}

pub(super) async fn list_projects(
    _: Bearer,
    State(state): State<Arc<AppState>>,
) -> Result<Success<ProjectList>> {
    state.projects.list().await.map(Success::new)
}

#[derive(Serialize)]
pub(super) struct ProjectReply {
    project: ProjectMeta,
}

pub(super) async fn create_project(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<NewProject>, JsonRejection>,
) -> Result<(StatusCode, Success<ProjectReply>)> {
    let project = state.projects.create(json_body(body)?).await?;
    Ok((
        StatusCode::CREATED,
        Success::new(ProjectReply { project }).with_message("Project created"),
    ))
}

pub(super) async fn update_project(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: std::result::Result<Json<ProjectFields>, JsonRejection>,
) -> Result<Success<ProjectReply>> {
    let project = state.projects.update(&name, json_body(body)?).await?;
    Ok(Success::new(ProjectReply { project }).with_message("Project updated"))
}

pub(super) async fn delete_project(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Success<NoBody>> {
    state.projects.delete(&name).await?;
    Ok(Success::new(NoBody {}).with_message("Project deleted"))
}

pub(super) async fn add_cashout(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CashoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Success<CashoutWritten>)> {
    let written = state.ledger.add_cashout(json_body(body)?).await?;
    let message = format!(
        "Cashout saved to '{}' row {}",
        written.sheet, written.row_index
    );
    Ok((
        StatusCode::CREATED,
        Success::new(written).with_message(message),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CashoutQuery {
    #[serde(default)]
    project_sheet: Option<String>,
    #[serde(default)]
    month: Option<String>,
}

pub(super) async fn list_cashout(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    Query(query): Query<CashoutQuery>,
) -> Result<Success<CashoutList>> {
    state
        .ledger
        .list_cashout(
            query.project_sheet.as_deref().unwrap_or_default(),
            query.month.as_deref().unwrap_or_default(),
        )
        .await
        .map(Success::new)
}

pub(super) async fn cashout_summary(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    Query(query): Query<CashoutQuery>,
) -> Result<Success<CashoutSummary>> {
    state
        .ledger
        .summary(query.project_sheet.as_deref().unwrap_or_default())
        .await
        .map(Success::new)
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct DashboardQuery {
    #[serde(default)]
    project: Option<String>,
}

pub(super) async fn dashboard(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    match state.dashboard.overview(query.project.as_deref()).await? {
        OverviewReply::Found(overview) => Ok(Success::new(overview).into_response()),
        OverviewReply::UnknownProject { projects } => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "message": "The project tab was not found",
                "projects": projects,
            })),
        )
            .into_response()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupRequest {
    #[serde(default)]
    name_prefix: Option<String>,
}

#[derive(Serialize)]
pub(super) struct BackupReply {
    backup: crate::api::CopiedFile,
}

/// The body is optional here, so it is parsed by hand.
pub(super) async fn backup(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Success<BackupReply>> {
    let request: BackupRequest = if body.iter().all(u8::is_ascii_whitespace) {
        BackupRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| Error::msg(ErrorType::Request, format!("Invalid JSON body: {e}")))?
    };
    let backup = state.backup.run(request.name_prefix.as_deref()).await?;
    Ok(Success::new(BackupReply { backup })
        .with_message("The spreadsheet was copied to Google Drive"))
}

pub(super) async fn rekap_rows(
    _: Bearer,
    State(state): State<Arc<AppState>>,
) -> Result<Success<RekapRows>> {
    state.rekap.rows().await.map(Success::new)
}

pub(super) async fn rekap_append(
    _: Bearer,
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Success<Appended>)> {
    let appended = state.rekap.append(&json_body(body)?).await?;
    Ok((
        StatusCode::CREATED,
        Success::new(appended).with_message("Row appended after the last filled row"),
    ))
}
