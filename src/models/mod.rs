pub mod grade;
pub mod notification;
pub mod subject;
pub mod user;
