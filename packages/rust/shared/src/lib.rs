//! Shared types, error model, and configuration for texquiz.
//!
//! This crate is the foundation depended on by all other texquiz crates.
//! It provides:
//! - [`TexquizError`], the unified error type
//! - Domain types ([`QuestionRecord`], [`QuestionSet`], [`RenderResult`])
//! - Style options ([`StyleConfig`]) and configuration ([`AppConfig`], config loading)
//! - The marker strings of the question markup ([`markup`])

pub mod config;
pub mod error;
pub mod markup;
pub mod style;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ToolchainConfig, config_dir, config_file_path, expand_home,
    init_config, load_config, load_config_from,
};
pub use error::{Result, TexquizError};
pub use style::{ChoiceLayout, Margins, PagePreset, PageSize, StyleConfig};
pub use types::{QuestionRecord, QuestionSet, RenderResult};
