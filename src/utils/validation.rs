use axum::extract::FromRequest;
use validator::Validate;

use crate::error::{Error, Result};

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate()?;
    Ok(())
}

/// Treats absent and blank strings alike, as the dashboards send both.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn require<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str> {
    present(value).ok_or_else(|| Error::BadRequest(message.to_string()))
}
