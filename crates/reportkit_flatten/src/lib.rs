//! `reportkit_flatten` v1:
//! Schema-driven flattening of one nested report table into flat rows.
//!
//! Modules:
//! - `spec`    : schema field model, flat table model, errors
//! - `flatten` : pure flattening kernel
pub mod flatten;
pub mod spec;

pub use flatten::{classify_schema_fields, derive_table_columns, flatten};
pub use spec::{EnumSchemaField, FlattenError, FlattenResult, SpecFlatTable, SpecSchemaLayout};
