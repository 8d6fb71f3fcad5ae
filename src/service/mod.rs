//! Service layer module

pub mod complaint_service;
pub mod department;
pub mod letter;
pub mod types;

pub use complaint_service::ComplaintService;
pub use types::*;
