pub mod adapter;
pub mod ast;
pub mod config;
pub mod engine;
pub mod error;

#[cfg(feature = "python")]
pub mod python;

pub use adapter::{
    Adapter, AdapterRegistry, BackendQuery, CompiledQuery, MemoryAdapter, MemoryQuery,
    SharedRegistry, SqlAdapter,
};
pub use ast::{Context, Query, TemplateEngine};
pub use config::Config;
pub use engine::UniversQl;
pub use error::{Error, Result, SyntaxError};
