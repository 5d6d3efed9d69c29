pub mod ast;
pub mod config;
pub mod entity;
pub mod error;
pub mod ir;
pub mod lower;

pub use ast::Syntax;
pub use config::LowerConfig;
pub use error::CoreError;
pub use ir::Node;
pub use lower::{Mode, Translation, Translator};
