pub mod cache;
pub mod portal;

pub use portal::{MutationReport, PortalClient, StudentData};
