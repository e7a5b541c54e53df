pub mod auth_dto;
pub mod diagnostics_dto;
pub mod grades_dto;
pub mod notification_dto;
