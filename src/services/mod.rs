pub mod auth_service;
pub mod diagnostics_service;
pub mod google_auth;
pub mod google_sheets;
pub mod grade_service;
pub mod memory_sheets;
pub mod notification_service;
pub mod roster_service;
pub mod schedule_service;
pub mod sheets_backend;
pub mod statistics_service;
