pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    auth_service::AuthService, diagnostics_service::DiagnosticsService,
    grade_service::GradeService, notification_service::NotificationService,
    roster_service::Roster, schedule_service::ScheduleService, sheets_backend::SheetsBackend,
};
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub roster: Arc<Roster>,
    pub grade_service: GradeService,
    pub notification_service: NotificationService,
    pub schedule_service: ScheduleService,
    pub diagnostics_service: DiagnosticsService,
    pub auth_service: AuthService,
}

impl AppState {
    pub fn new(config: Config, sheets: Arc<dyn SheetsBackend>) -> Self {
        Self::with_clock(config, sheets, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, sheets: Arc<dyn SheetsBackend>, clock: Arc<dyn Clock>) -> Self {
        let roster = Arc::new(Roster::builtin());

        let grade_service = GradeService::new(sheets.clone(), roster.clone(), clock.clone());
        let notification_service = NotificationService::new(sheets.clone(), clock);
        let schedule_service = ScheduleService::new(sheets.clone());
        let diagnostics_service =
            DiagnosticsService::new(sheets, config.google.clone(), roster.clone());
        let auth_service = AuthService::new(
            roster.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_hours,
        );

        Self {
            config: Arc::new(config),
            roster,
            grade_service,
            notification_service,
            schedule_service,
            diagnostics_service,
            auth_service,
        }
    }
}
