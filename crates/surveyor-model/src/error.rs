//! Schema validation errors.
//!
//! All of these are raised while a schema is being constructed, before any
//! database connection exists. A misconfigured schema must never be
//! discoverable only after partial writes.

use thiserror::Error;

/// Errors produced while validating a schema definition.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema '{label}' declares property '{name}' more than once")]
    DuplicateProperty { label: String, name: String },

    #[error("schema '{label}' has no 'id' property; every node needs exactly one identifying attribute")]
    MissingId { label: String },

    #[error("schema '{label}' declares reserved property '{name}'; it is stamped by the query builder")]
    ReservedProperty { label: String, name: String },

    #[error("invalid matcher on attribute '{key}': {reason}")]
    BadMatcher { key: String, reason: String },

    #[error("relationship '{rel_label}' to '{target_label}' has an empty target matcher")]
    EmptyMatcher {
        rel_label: String,
        target_label: String,
    },

    #[error(
        "owning relationship '{rel_label}' on schema '{label}' must match its target \
         through run parameters only; '{key}' reads a record field"
    )]
    OwnerMatcherNotParam {
        label: String,
        rel_label: String,
        key: String,
    },

    #[error(
        "owning relationship '{rel_label}' on schema '{label}' must use exact matching on '{key}'"
    )]
    OwnerMatcherNotExact {
        label: String,
        rel_label: String,
        key: String,
    },

    #[error(
        "schema '{label}' has an owning relationship but unscoped cleanup; this would delete \
         stale nodes of every tenant, not just the one being synced"
    )]
    OwnedButUnscoped { label: String },

    #[error("cross-reference link '{rel_label}' is missing its {side} matcher")]
    LinkMissingMatcher { rel_label: String, side: String },
}
