use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::grade::{Quarter, StudentGrades};
use crate::services::grade_service::GradeEdit;
use crate::utils::validation::{present, require};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGradesQuery {
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGradesResponse {
    pub success: bool,
    pub data: StudentGrades,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeAction {
    Add,
    Update,
    Delete,
}

impl std::str::FromStr for GradeAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(GradeAction::Add),
            "update" => Ok(GradeAction::Update),
            "delete" => Ok(GradeAction::Delete),
            other => Err(Error::BadRequest(format!("Unknown action: {}", other))),
        }
    }
}

/// Body of `POST /api/manage-grades`. Every field is optional on the wire
/// so that missing ones surface as 400s naming what is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManageGradeRequest {
    pub action: Option<String>,
    pub student_id: Option<String>,
    pub subject_id: Option<String>,
    #[validate(range(min = 0))]
    pub grade_index: Option<i64>,
    #[validate(range(min = 1, max = 10))]
    pub value: Option<i64>,
    /// Required for `add`. Sheet cells carry no dates, so it is not stored.
    pub date: Option<String>,
    pub quarter: Option<String>,
}

/// A validated grade mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeCommand {
    pub student_id: String,
    pub subject_id: String,
    pub quarter: Option<Quarter>,
    pub edit: GradeEdit,
}

impl ManageGradeRequest {
    pub fn into_command(self) -> Result<GradeCommand> {
        let student_id = require(&self.student_id, "Missing required parameters: studentId")?;
        let subject_id = require(&self.subject_id, "Missing required parameters: subjectId")?;
        let action: GradeAction = require(&self.action, "Missing required parameters: action")?.parse()?;
        let quarter = present(&self.quarter)
            .map(|q| q.parse::<Quarter>().map_err(Error::BadRequest))
            .transpose()?;

        let value = self
            .value
            .map(|v| u8::try_from(v).map_err(|_| Error::BadRequest(format!("Invalid grade value: {}", v))))
            .transpose()?;
        let index = self
            .grade_index
            .map(|i| usize::try_from(i).map_err(|_| Error::BadRequest(format!("Invalid gradeIndex: {}", i))))
            .transpose()?;
        let edit = match action {
            GradeAction::Add => {
                require(&self.date, "Missing date for add")?;
                GradeEdit::Add {
                    value: value.ok_or_else(|| Error::BadRequest("Missing grade value".to_string()))?,
                }
            }
            GradeAction::Update => match (index, value) {
                (Some(index), Some(value)) => GradeEdit::Update { index, value },
                _ => {
                    return Err(Error::BadRequest(
                        "Missing gradeIndex or value for update".to_string(),
                    ))
                }
            },
            GradeAction::Delete => GradeEdit::Delete {
                index: index.ok_or_else(|| {
                    Error::BadRequest("Missing gradeIndex for delete".to_string())
                })?,
            },
        };

        Ok(GradeCommand {
            student_id: student_id.to_string(),
            subject_id: subject_id.to_string(),
            quarter,
            edit,
        })
    }
}

impl From<&GradeCommand> for ManageGradeRequest {
    fn from(command: &GradeCommand) -> Self {
        let (action, grade_index, value) = match command.edit {
            GradeEdit::Add { value } => ("add", None, Some(value)),
            GradeEdit::Update { index, value } => ("update", Some(index), Some(value)),
            GradeEdit::Delete { index } => ("delete", Some(index), None),
        };
        Self {
            action: Some(action.to_string()),
            student_id: Some(command.student_id.clone()),
            subject_id: Some(command.subject_id.clone()),
            grade_index: grade_index.and_then(|i| i64::try_from(i).ok()),
            value: value.map(i64::from),
            date: None,
            quarter: command.quarter.map(|q| q.id().to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentsQuery {
    pub class: Option<String>,
}
