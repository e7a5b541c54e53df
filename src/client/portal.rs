use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::cache::{CachePolicy, TtlCache};
use crate::dto::auth_dto::{LoginPayload, LoginResponse};
use crate::dto::grades_dto::{GradeCommand, ManageGradeRequest};
use crate::error::{Error, Result};
use crate::models::grade::{Grade, Quarter, StudentGrades};
use crate::models::notification::{Notification, NotificationKind};
use crate::models::upcoming_test::UpcomingTest;
use crate::models::user::AuthUser;
use crate::services::grade_service::GradeEdit;
use crate::utils::time::Clock;

/// What happened to a grade mutation issued through the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationReport {
    /// The server confirmed the write.
    pub remote_applied: bool,
    /// The cached copy was edited because the server did not confirm.
    pub local_applied: bool,
}

impl MutationReport {
    pub fn is_applied(&self) -> bool {
        self.remote_applied || self.local_applied
    }
}

/// One student's grades together with the sheet's last-update stamp, as
/// shown on the dashboards. The stamp is empty when nothing was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentData {
    pub data: StudentGrades,
    pub last_update: String,
}

impl StudentData {
    pub fn empty(student_id: &str) -> Self {
        Self {
            data: StudentGrades::empty(student_id),
            last_update: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
    last_update: Option<String>,
    outcome: Option<String>,
}

const QUARTER_NOT_WRITABLE: &str = "quarter_not_writable";

/// Typed client for the portal API. Keeps a per-student grade cache and an
/// upcoming-tests cache, and mirrors unconfirmed grade edits into the
/// cached copy.
pub struct PortalClient {
    http: Client,
    base_url: String,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<String>>,
    grades: Mutex<TtlCache<String, StudentData>>,
    upcoming: Mutex<TtlCache<(), Vec<UpcomingTest>>>,
}

impl PortalClient {
    pub fn new(base_url: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            grades: Mutex::new(TtlCache::new(CachePolicy::student_grades(), clock.clone())),
            upcoming: Mutex::new(TtlCache::new(CachePolicy::upcoming_tests(), clock.clone())),
            clock,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Option<String> {
        self.token.lock().expect("token mutex poisoned").clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock().expect("token mutex poisoned") = token;
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = Self::checked(response).await?;
        body.data
            .ok_or_else(|| Error::Internal("Response carried no data".to_string()))
    }

    async fn checked<T: DeserializeOwned>(response: reqwest::Response) -> Result<Envelope<T>> {
        let status = response.status();
        let body: Envelope<T> = response.json().await?;
        if !status.is_success() || !body.success {
            let message = body.error.unwrap_or_else(|| status.to_string());
            return Err(match status.as_u16() {
                401 => Error::Unauthorized(message),
                403 => Error::Forbidden(message),
                404 => Error::NotFound(message),
                400 => Error::BadRequest(message),
                _ => Error::Internal(message),
            });
        }
        Ok(body)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthUser> {
        let payload = LoginPayload {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Unauthorized("Invalid username or password".to_string()));
        }
        let body: LoginResponse = response.json().await?;
        self.set_token(Some(body.token));
        info!(user_id = %body.user.id, "logged in");
        Ok(body.user)
    }

    pub fn logout(&self) {
        self.set_token(None);
        self.grades.lock().expect("grade cache mutex poisoned").clear();
    }

    async fn fetch_student(&self, student_id: &str) -> Result<StudentData> {
        let response = self
            .authorized(self.http.get(self.url("/api/student-grades")))
            .query(&[("studentId", student_id)])
            .send()
            .await?;
        let body = Self::checked::<StudentGrades>(response).await?;
        let data = body
            .data
            .ok_or_else(|| Error::Internal("Response carried no data".to_string()))?;
        Ok(StudentData {
            data,
            last_update: body.last_update.unwrap_or_default(),
        })
    }

    /// Grades of one student, served from cache while fresh. A failed fetch
    /// yields an empty bundle with an empty stamp that is not cached.
    pub async fn student_data(&self, student_id: &str) -> StudentData {
        let key = student_id.to_string();
        if let Some(cached) = self.grades.lock().expect("grade cache mutex poisoned").get(&key) {
            debug!(student_id, "grade cache hit");
            return cached;
        }

        match self.fetch_student(student_id).await {
            Ok(data) => {
                self.grades
                    .lock()
                    .expect("grade cache mutex poisoned")
                    .insert(key, data.clone());
                data
            }
            Err(err) => {
                warn!(student_id, error = %err, "failed to fetch student grades");
                StudentData::empty(student_id)
            }
        }
    }

    pub async fn add_grade(
        &self,
        student_id: &str,
        subject_id: &str,
        value: u8,
        quarter: Option<Quarter>,
    ) -> MutationReport {
        self.mutate(student_id, subject_id, quarter, GradeEdit::Add { value })
            .await
    }

    pub async fn update_grade(
        &self,
        student_id: &str,
        subject_id: &str,
        index: usize,
        value: u8,
        quarter: Option<Quarter>,
    ) -> MutationReport {
        self.mutate(student_id, subject_id, quarter, GradeEdit::Update { index, value })
            .await
    }

    pub async fn delete_grade(
        &self,
        student_id: &str,
        subject_id: &str,
        index: usize,
        quarter: Option<Quarter>,
    ) -> MutationReport {
        self.mutate(student_id, subject_id, quarter, GradeEdit::Delete { index })
            .await
    }

    async fn send_mutation(&self, command: &GradeCommand) -> Result<()> {
        let mut request = ManageGradeRequest::from(command);
        if matches!(command.edit, GradeEdit::Add { .. }) {
            request.date = Some(self.clock.now().to_rfc3339());
        }
        let response = self
            .authorized(self.http.post(self.url("/api/manage-grades")))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body: Envelope<serde_json::Value> = response.json().await?;
        if status.is_success() && body.success {
            return Ok(());
        }
        let message = body.error.unwrap_or_else(|| status.to_string());
        if status.as_u16() == 400 || body.outcome.as_deref() == Some(QUARTER_NOT_WRITABLE) {
            return Err(Error::BadRequest(message));
        }
        Err(Error::Internal(message))
    }

    async fn mutate(
        &self,
        student_id: &str,
        subject_id: &str,
        quarter: Option<Quarter>,
        edit: GradeEdit,
    ) -> MutationReport {
        let command = GradeCommand {
            student_id: student_id.to_string(),
            subject_id: subject_id.to_string(),
            quarter,
            edit,
        };

        match self.send_mutation(&command).await {
            Ok(()) => {
                self.grades
                    .lock()
                    .expect("grade cache mutex poisoned")
                    .on_write(&command.student_id);
                MutationReport {
                    remote_applied: true,
                    local_applied: false,
                }
            }
            Err(Error::BadRequest(reason)) => {
                warn!(student_id, subject_id, %reason, "grade mutation refused by the server");
                MutationReport::default()
            }
            Err(err) => {
                warn!(student_id, subject_id, error = %err, "grade mutation not confirmed; applying locally");
                let local_applied = self.echo_locally(&command);
                MutationReport {
                    remote_applied: false,
                    local_applied,
                }
            }
        }
    }

    /// Edits the cached copy the way the server would have. The current
    /// quarter has no archived list, so quarter-scoped edits to it are never
    /// echoed.
    fn echo_locally(&self, command: &GradeCommand) -> bool {
        let quarter = command.quarter;
        if quarter == Some(Quarter::Current) {
            return false;
        }
        let mut cache = self.grades.lock().expect("grade cache mutex poisoned");

        match command.edit {
            GradeEdit::Add { value } => {
                let bundle = cache.get_or_insert_with(command.student_id.clone(), || {
                    StudentData::empty(&command.student_id)
                });
                bundle
                    .data
                    .subject_mut(&command.subject_id)
                    .list_mut(quarter)
                    .push(Grade::new(value, self.clock.now()));
                true
            }
            GradeEdit::Update { index, value } => cache
                .peek_mut(&command.student_id)
                .and_then(|bundle| cached_list(&mut bundle.data, &command.subject_id, quarter))
                .and_then(|list| list.get_mut(index))
                .map(|grade| grade.value = value)
                .is_some(),
            GradeEdit::Delete { index } => cache
                .peek_mut(&command.student_id)
                .and_then(|bundle| cached_list(&mut bundle.data, &command.subject_id, quarter))
                .filter(|list| index < list.len())
                .map(|list| list.remove(index))
                .is_some(),
        }
    }

    /// Upcoming tests, cached for the upcoming-tests TTL. Failures yield an
    /// empty list that is not cached.
    pub async fn upcoming_tests(&self) -> Vec<UpcomingTest> {
        if let Some(cached) = self.upcoming.lock().expect("upcoming cache mutex poisoned").get(&()) {
            return cached;
        }

        let fetched = async {
            let response = self
                .authorized(self.http.get(self.url("/api/upcoming-tests")))
                .send()
                .await?;
            Self::envelope::<Vec<UpcomingTest>>(response).await
        }
        .await;

        match fetched {
            Ok(tests) => {
                self.upcoming
                    .lock()
                    .expect("upcoming cache mutex poisoned")
                    .insert((), tests.clone());
                tests
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch upcoming tests");
                Vec::new()
            }
        }
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        let response = self
            .authorized(self.http.get(self.url("/api/notifications")))
            .send()
            .await?;
        Self::envelope(response).await
    }

    pub async fn send_notification(
        &self,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Result<Notification> {
        let response = self
            .authorized(self.http.post(self.url("/api/notifications")))
            .json(&json!({ "title": title, "message": message, "type": kind.as_str() }))
            .send()
            .await?;
        Self::envelope(response).await
    }
}

/// An existing list inside a cached bundle; never creates one.
fn cached_list<'a>(
    bundle: &'a mut StudentGrades,
    subject_id: &str,
    quarter: Option<Quarter>,
) -> Option<&'a mut Vec<Grade>> {
    let subject = bundle.subjects.get_mut(subject_id)?;
    match quarter {
        None => Some(&mut subject.current),
        Some(q) => subject.quarters.get_mut(&q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::ManualClock;
    use chrono::{TimeZone, Utc};

    // Nothing listens on port 9 of the loopback interface, so every request fails.
    fn offline_client() -> (PortalClient, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 4, 20, 9, 0, 0).unwrap());
        let client = PortalClient::new("http://127.0.0.1:9/", Arc::new(clock.clone())).unwrap();
        (client, clock)
    }

    #[tokio::test]
    async fn add_without_cache_creates_bundle_locally() {
        let (client, clock) = offline_client();
        let report = client.add_grade("student2", "math", 9, None).await;
        assert_eq!(
            report,
            MutationReport {
                remote_applied: false,
                local_applied: true
            }
        );

        let cached = client.student_data("student2").await;
        assert_eq!(cached.data.subjects["math"].current, vec![Grade::new(9, clock.now())]);
        assert_eq!(cached.last_update, "");
    }

    #[tokio::test]
    async fn update_and_delete_need_cached_entry_and_valid_index() {
        let (client, _clock) = offline_client();
        assert!(!client.update_grade("student2", "math", 0, 7, None).await.is_applied());
        assert!(!client.delete_grade("student2", "math", 0, None).await.is_applied());

        client.add_grade("student2", "math", 4, Some(Quarter::Q1)).await;
        assert!(!client.update_grade("student2", "math", 3, 7, Some(Quarter::Q1)).await.local_applied);
        assert!(client.update_grade("student2", "math", 0, 7, Some(Quarter::Q1)).await.local_applied);

        let cached = client.student_data("student2").await;
        assert_eq!(cached.data.subjects["math"].quarters[&Quarter::Q1][0].value, 7);

        assert!(client.delete_grade("student2", "math", 0, Some(Quarter::Q1)).await.local_applied);
        assert!(!client.delete_grade("student2", "math", 0, Some(Quarter::Q1)).await.local_applied);
    }

    #[tokio::test]
    async fn failed_reads_fall_back_to_empty_results() {
        let (client, _clock) = offline_client();
        let data = client.student_data("student5").await;
        assert_eq!(data, StudentData::empty("student5"));
        assert!(data.data.subjects["math"].current.is_empty());
        assert!(client.upcoming_tests().await.is_empty());
        assert!(client.notifications().await.is_err());
    }

    #[tokio::test]
    async fn current_quarter_edits_are_never_echoed() {
        let (client, _clock) = offline_client();
        client.add_grade("student3", "math", 6, None).await;

        let report = client.add_grade("student3", "math", 8, Some(Quarter::Current)).await;
        assert_eq!(report, MutationReport::default());
        assert!(!client.delete_grade("student3", "math", 0, Some(Quarter::Current)).await.is_applied());

        let cached = client.student_data("student3").await;
        assert_eq!(cached.data.subjects["math"].current.len(), 1);
        assert!(cached.data.subjects["math"].quarters.get(&Quarter::Current).is_none());
    }

    #[test]
    fn report_serializes_camel_case() {
        let json = serde_json::to_value(MutationReport {
            remote_applied: true,
            local_applied: false,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "remoteApplied": true, "localApplied": false }));
    }
}
