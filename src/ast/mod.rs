//! Query strings and their canonical model.
//!
//! ```text
//! query string
//!       ↓
//! Parser            (parser.rs)
//!       ↓
//! Query model       (types.rs, filters in postfix; postfix.rs)
//!       ↓
//! Template binding  (template.rs)   ──▶  adapters (crate::adapter)
//!
//! Query ──▶ Formatter (formatter.rs) ──▶ canonical query string
//! ```
pub mod formatter;
pub mod parser;
pub mod postfix;
pub mod template;
pub mod types;

pub use formatter::{format_filters, format_query};
pub use parser::{is_valid_path, parse_literal, parse_query, parse_query_with};
pub use template::{Context, Fragment, TemplateEngine, TemplateFn, DEFAULT_MARKER};
pub use types::*;
