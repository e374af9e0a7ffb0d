#![forbid(unsafe_code)]

pub mod batch;
pub mod classify;
pub mod config;
pub mod organization;
pub mod record;
pub mod report;
pub mod user;

/// adimport-directory re-exports
pub mod directory {
    pub use adimport_directory::*;
}
