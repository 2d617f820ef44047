//! # Postboard Core
//!
//! The domain layer of Postboard.
//! Entities, pagination, form validation, ports and the services built on them.
//! No infrastructure dependencies live here.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError};
pub use pagination::{Page, PageRequest};
