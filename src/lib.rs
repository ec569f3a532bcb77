//! Almar
//!
//! Batch editing of subject and classification fields in Alma catalog
//! records: find records over SRU, rewrite their 084/648/650/651/655
//! fields and save them back through the Alma Bibs API.

pub mod cli;
pub mod config;
pub mod error;
pub mod marc;
pub mod models;
pub mod services;
pub mod tasks;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
