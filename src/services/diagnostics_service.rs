use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::config::{GoogleSettings, EMAIL_VAR, PRIVATE_KEY_VAR, SPREADSHEET_ID_VAR};
use crate::error::{Error, Result};
use crate::services::roster_service::Roster;
use crate::services::sheets_backend::{SheetsBackend, SpreadsheetInfo};
use crate::utils::masking::{mask_email, mask_id};

/// Which service-account settings are present. Values are never exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvStatus {
    pub email: bool,
    pub private_key: bool,
    pub spreadsheet_id: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTest {
    MissingSetting {
        variable: &'static str,
        message: &'static str,
        env_status: EnvStatus,
    },
    Connected {
        service_account: String,
        spreadsheet_id: String,
        env_status: EnvStatus,
    },
    Failed {
        error: String,
        env_status: EnvStatus,
    },
}

#[derive(Clone)]
pub struct DiagnosticsService {
    sheets: Arc<dyn SheetsBackend>,
    settings: GoogleSettings,
    roster: Arc<Roster>,
}

impl DiagnosticsService {
    pub fn new(sheets: Arc<dyn SheetsBackend>, settings: GoogleSettings, roster: Arc<Roster>) -> Self {
        Self {
            sheets,
            settings,
            roster,
        }
    }

    pub fn env_status(&self) -> EnvStatus {
        EnvStatus {
            email: self.settings.service_account_email.is_some(),
            private_key: self.settings.private_key_looks_valid(),
            spreadsheet_id: self.settings.spreadsheet_id.is_some(),
        }
    }

    /// Title and sheet names of the configured spreadsheet.
    pub async fn check_status(&self) -> Result<SpreadsheetInfo> {
        let info = self.sheets.spreadsheet_info().await?;
        info!(title = %info.title, sheets = info.sheets.len(), "spreadsheet reachable");
        Ok(info)
    }

    /// Checks each setting in turn, then performs a live authorization.
    pub async fn test_connection(&self) -> ConnectionTest {
        let env_status = self.env_status();
        let missing = [
            (env_status.email, EMAIL_VAR, "Service account email is missing"),
            (
                env_status.private_key,
                PRIVATE_KEY_VAR,
                "Service account private key is missing or malformed",
            ),
            (env_status.spreadsheet_id, SPREADSHEET_ID_VAR, "Spreadsheet id is missing"),
        ]
        .into_iter()
        .find(|(present, _, _)| !present);
        if let Some((_, variable, message)) = missing {
            return ConnectionTest::MissingSetting {
                variable,
                message,
                env_status,
            };
        }

        match self.sheets.authorize().await {
            Ok(()) => ConnectionTest::Connected {
                service_account: mask_email(
                    self.settings.service_account_email.as_deref().unwrap_or_default(),
                ),
                spreadsheet_id: mask_id(self.settings.spreadsheet_id.as_deref().unwrap_or_default()),
                env_status,
            },
            Err(err) => {
                error!(error = %err, "Google Sheets authorization failed");
                ConnectionTest::Failed {
                    error: err.to_string(),
                    env_status,
                }
            }
        }
    }

    /// Confirms the credentials work before a student's sheet is used.
    pub async fn init_student_sheet(&self, student_id: &str) -> Result<bool> {
        if self.roster.student_by_id(student_id).is_none() {
            return Err(Error::NotFound(format!("Student {} not found", student_id)));
        }
        match self.sheets.authorize().await {
            Ok(()) => Ok(true),
            Err(err) => {
                error!(student_id, error = %err, "student sheet initialization failed");
                Ok(false)
            }
        }
    }
}
