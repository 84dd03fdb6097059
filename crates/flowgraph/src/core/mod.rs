//! Core state engine for the flow-chart editor
//!
//! The document model and everything that mutates it: reversible commands,
//! grouping and collapse, selection, connection rules and the palettes.

mod config;
mod database;
mod document;
mod error;
mod grouping;
mod history;
pub mod logging;
mod selection;
mod session;
mod shapes;
mod stencil;
mod types;
mod validator;

pub use config::*;
pub use database::*;
pub use document::*;
pub use error::*;
pub use grouping::*;
pub use history::*;
pub use logging::*;
pub use selection::*;
pub use session::*;
pub use shapes::*;
pub use stencil::*;
pub use types::*;
pub use validator::*;
