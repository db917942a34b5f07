//! envboot-profile - session bootstrap from shell profiles
//!
//! This crate provides:
//! - A lexer and parser for the POSIX sh subset found in login profiles
//! - Lowering of parsed profiles into [`Directive`]s
//! - An explicit [`SessionState`] in place of the shell's ambient tables
//! - [`ProfileLoader::initialize_session`], which sources the optional
//!   profiles and registers the fixed aliases and environment
//! - A renderer producing a script the host shell can `eval`

pub mod ast;
pub mod builtin;
pub mod directive;
pub mod error;
pub mod expansion;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod render;
pub mod session;

pub use directive::{parse_directives, Directive, ParsedDirectives, Test};
pub use error::{ProfileError, ProfileResult};
pub use loader::{load_config, InitReport, ProfileLoader};
pub use parser::parse;
pub use render::render;
pub use session::{AliasEntry, SessionState, Variable};
