//! This crate turns the Vulkan XML registry into the generated sources of an
//! interception layer.
//!
//! The pipeline has three steps:
//!
//! 1. `parse_file` / `parse_stream` read registry documents into a
//!    [`Registry`]. Several documents can be combined with
//!    [`Registry::extend`].
//! 2. [`model::build`] resolves commands, features, extensions, handles and
//!    structs into a read-only [`model::Model`].
//! 3. [`gen::Generator`] emits the dispatch tables, command wrappers,
//!    proc-address functions and struct-to-JSON converters.
//!
//! ```no_run
//! use std::path::Path;
//! use vk_layer_gen::{config::Config, gen::{Generator, Target}, model};
//!
//! let registry = vk_layer_gen::parse_file(Path::new("vk.xml"))?;
//! let config = Config::default();
//! let model = model::build(&registry, &config)?;
//! Generator::new(&model, &config).write_targets(&Target::ALL, Path::new("generated"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod parse;
mod types;

pub mod config;
pub mod depends;
pub mod gen;
pub mod guard;
pub mod model;

pub use parse::parse_file;
pub use parse::parse_stream;
pub use types::*;
