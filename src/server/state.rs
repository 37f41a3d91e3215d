use crate::api::Sheet;
use crate::auth::{AdminCredentials, Auth};
use crate::backup::Backup;
use crate::dashboard::{Clock, Dashboard};
use crate::ledger::Ledger;
use crate::model::Locale;
use crate::projects::Projects;
use crate::rekap::Rekap;
use crate::Config;
use chrono::TimeDelta;
use std::sync::Arc;

/// Everything the handlers share. All parts hold the same `Sheet`.
pub struct AppState {
    pub auth: Auth,
    pub ledger: Ledger,
    pub dashboard: Dashboard,
    pub projects: Projects,
    pub backup: Backup,
    pub rekap: Rekap,
}

impl AppState {
    pub fn new(
        config: &Config,
        sheet: Arc<dyn Sheet>,
        admin: AdminCredentials,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let secs = i64::try_from(config.dashboard_ttl_secs()).unwrap_or(i64::MAX);
        let ttl = TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX);
        Arc::new(Self {
            auth: Auth::new(admin),
            ledger: Ledger::new(sheet.clone(), Locale::default(), config.reserve_rows()),
            dashboard: Dashboard::new(sheet.clone(), ttl, clock),
            projects: Projects::new(sheet.clone()),
            backup: Backup::new(sheet.clone(), config.sheet_name(), config.backup_folder_id()),
            rekap: Rekap::new(sheet, config.sheet_name()),
        })
    }
}
