//! Structural validation and field inspection for pipe-delimited HL7 v2
//! messages.
//!
//! Everything here is a pure function of the message text and a
//! [`SchemaRegistry`] snapshot. The registry is built once (see
//! [`registry::load`]) and handed to [`validate`] and [`resolve_field`]
//! explicitly, so callers are free to validate from as many threads as they
//! like.
//!
//! ```
//! use hl7_check::{registry::SchemaRegistry, validate, Severity};
//!
//! let registry = SchemaRegistry::fallback();
//! let diagnostics = validate("", &registry);
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].message, "Empty message");
//! assert_eq!(diagnostics[0].severity, Severity::Error);
//! ```

pub mod config;
pub mod field_info;
pub mod message;
pub mod registry;
pub mod validation;

pub use field_info::{resolve_field, FieldInfo};
pub use message::{message_type, split};
pub use registry::SchemaRegistry;
pub use validation::{is_valid, validate, Severity, ValidationError};
