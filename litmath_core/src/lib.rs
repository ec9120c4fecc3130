//! `litmath_core` is the core library for litmath, a calculator for plain
//! text notes. Math written in fenced ```` ```math ```` blocks or on lines
//! starting with `=` is evaluated line by line, with variables shared across
//! the whole document and a running total kept per block.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Note text
//!   → Trimmer (keeps block interiors and inline lines, blanks the rest)
//!   → Classifier (boundary, fence, config, comment or expression)
//!   → Processor (evaluates expressions, keeps scope and running totals)
//!   → Vec<Option<LineData>> (one entry per input line)
//!   → Annotator (optional plain text rendering)
//! ```
//!
//! ## Modules
//!
//! - [`trim`]: the line trimmer.
//! - [`classify`]: line classification and inline marker handling.
//! - [`process`]: the per-line fold producing [`LineData`].
//! - [`engine`]: expression parsing, evaluation, simplification, units and
//!   result formatting.
//! - [`currency`]: exchange rate parsing and currency unit installation.
//! - [`config`]: note settings and `litmath.toml` loading.
//! - [`host`] and [`Debouncer`]: async helpers for applications embedding the
//!   processor.
//!
//! ## Quick Start
//!
//! ```rust
//! use litmath_core::GlobalConfig;
//! use litmath_core::LineData;
//! use litmath_core::Session;
//!
//! let mut session = Session::new(GlobalConfig::default());
//! let document = session.process("```math\na = 2\nb = a * 3\ntotal\n```");
//!
//! let results: Vec<_> = document
//! 	.entries()
//! 	.filter_map(|(_, data)| data.as_expression())
//! 	.map(|line| line.result.as_str())
//! 	.collect();
//! assert_eq!(results, ["2", "6", "8"]);
//! assert!(matches!(document.data[0], None));
//! assert!(matches!(document.data[1], Some(LineData::Expression(_))));
//! ```

pub use annotate::*;
pub use config::*;
pub use currency::*;
pub use debounce::*;
pub use error::*;
pub use host::*;
pub use process::*;
pub use scope::*;
pub use session::*;

mod annotate;
pub mod classify;
pub mod config;
pub mod currency;
mod debounce;
pub mod engine;
#[allow(unused_assignments)]
mod error;
pub mod host;
pub mod process;
mod scope;
mod session;
pub mod trim;

#[cfg(test)]
mod __tests;
