use std::sync::Arc;

use chrono::SecondsFormat;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::notification::{Notification, NotificationKind};
use crate::services::sheets_backend::{
    range, SheetsBackend, CURRENT_GRADES_SHEET, LAST_UPDATE_CELL, NOTIFICATIONS_HEADER,
    NOTIFICATIONS_RANGE, NOTIFICATIONS_SHEET,
};
use crate::utils::time::{display_stamp, Clock};

#[derive(Clone)]
pub struct NotificationService {
    sheets: Arc<dyn SheetsBackend>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(sheets: Arc<dyn SheetsBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { sheets, clock }
    }

    /// Creates the notifications sheet with its header row when missing.
    pub async fn ensure_sheet(&self) -> Result<()> {
        let spreadsheet = self.sheets.spreadsheet_info().await?;
        if spreadsheet.sheets.iter().any(|s| s == NOTIFICATIONS_SHEET) {
            return Ok(());
        }
        let header = NOTIFICATIONS_HEADER.iter().map(|h| h.to_string()).collect();
        self.sheets.create_sheet(NOTIFICATIONS_SHEET, header).await?;
        info!(sheet = NOTIFICATIONS_SHEET, "created notifications sheet");
        Ok(())
    }

    /// Newest first. Rows missing an id, title or message are skipped.
    pub async fn list(&self) -> Result<Vec<Notification>> {
        self.ensure_sheet().await?;
        let rows = self
            .sheets
            .get_values(&range(NOTIFICATIONS_SHEET, NOTIFICATIONS_RANGE))
            .await?;

        let mut notifications: Vec<Notification> = rows
            .into_iter()
            .filter(|row| row.len() >= 3)
            .filter_map(|row| {
                let mut cells = row.into_iter();
                let id = cells.next().unwrap_or_default();
                let title = cells.next().unwrap_or_default();
                let message = cells.next().unwrap_or_default();
                if id.trim().is_empty() || title.trim().is_empty() || message.trim().is_empty() {
                    return None;
                }
                let kind = cells
                    .next()
                    .map(|k| NotificationKind::from_cell(&k))
                    .unwrap_or_default();
                let date = cells
                    .next()
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| self.iso_now());
                Some(Notification {
                    id,
                    title,
                    message,
                    kind,
                    date,
                })
            })
            .collect();
        notifications.reverse();
        Ok(notifications)
    }

    pub async fn add(
        &self,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Result<Notification> {
        self.ensure_sheet().await?;
        let now = self.clock.now();
        let notification = Notification {
            id: now.timestamp_millis().to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind,
            date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let row = vec![
            notification.id.clone(),
            notification.title.clone(),
            notification.message.clone(),
            kind.as_str().to_string(),
            notification.date.clone(),
        ];
        self.sheets
            .append_row(&range(NOTIFICATIONS_SHEET, "A2"), row)
            .await?;
        info!(id = %notification.id, kind = kind.as_str(), "notification added");

        // The stamp is informational; a failed stamp does not undo the append.
        if let Err(err) = self.stamp_last_update().await {
            warn!(error = %err, "failed to update last-update cell");
        }
        Ok(notification)
    }

    pub async fn stamp_last_update(&self) -> Result<()> {
        let stamp = display_stamp(self.clock.now());
        self.sheets
            .update_value(&range(CURRENT_GRADES_SHEET, LAST_UPDATE_CELL), &stamp)
            .await
    }

    fn iso_now(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_sheets::MemorySheets;
    use crate::utils::time::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Arc<MemorySheets>, Arc<ManualClock>, NotificationService) {
        let sheets = Arc::new(MemorySheets::with_grade_sheets());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 4, 20, 9, 0, 0).unwrap(),
        ));
        let service = NotificationService::new(sheets.clone(), clock.clone());
        (sheets, clock, service)
    }

    #[tokio::test]
    async fn creates_the_sheet_on_first_use() {
        let (sheets, _, service) = setup();
        assert!(!sheets.has_sheet("Notifications"));
        assert!(service.list().await.unwrap().is_empty());
        assert!(sheets.has_sheet("Notifications"));
        assert_eq!(sheets.rows("Notifications")[0][1], "Заголовок");

        service.ensure_sheet().await.unwrap();
        assert_eq!(sheets.write_count(), 1);
    }

    #[tokio::test]
    async fn lists_newest_first_and_stamps_last_update() {
        let (sheets, clock, service) = setup();
        let first = service
            .add("Контрольная", "Завтра по математике", NotificationKind::Warning)
            .await
            .unwrap();
        clock.advance(Duration::seconds(5));
        service
            .add("Итоги", "Оценки выставлены", NotificationKind::Success)
            .await
            .unwrap();

        assert_eq!(first.id, "1745139600000");
        assert_eq!(first.date, "2025-04-20T09:00:00.000Z");

        let list = service.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "Итоги");
        assert_eq!(list[0].kind, NotificationKind::Success);
        assert_eq!(list[1].kind, NotificationKind::Warning);
        assert!(sheets.cell("Grades", "U2").is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn incomplete_rows_are_skipped_and_defaults_fill_gaps() {
        let (sheets, _, service) = setup();
        service.ensure_sheet().await.unwrap();
        sheets.set_row("Notifications", 2, &["1", "Only title"]);
        sheets.set_row("Notifications", 3, &["2", "", "No title"]);
        sheets.set_row("Notifications", 4, &["3", "Title", "Body", "urgent"]);

        let list = service.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "3");
        assert_eq!(list[0].kind, NotificationKind::Info);
        assert_eq!(list[0].date, "2025-04-20T09:00:00.000Z");
    }

    #[tokio::test]
    async fn append_failures_propagate() {
        let (sheets, _, service) = setup();
        service.ensure_sheet().await.unwrap();
        sheets.fail_writes(true);
        assert!(service
            .add("t", "m", NotificationKind::Info)
            .await
            .is_err());
    }
}
