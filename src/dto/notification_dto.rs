use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateNotificationPayload {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub message: Option<String>,
    /// One of info, success, warning, error; anything else reads as info.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
