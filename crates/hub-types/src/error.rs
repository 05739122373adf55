//! Errors shared by the data-model constructors in this crate.

use thiserror::Error;

/// Validation failures when building a hub-types value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("name exceeds maximum length of {max} characters")]
    NameTooLong { max: usize },

    #[error("service descriptor exceeds maximum length of {max} characters")]
    DescriptorTooLong { max: usize },

    #[error("name must not be empty")]
    EmptyName,
}
