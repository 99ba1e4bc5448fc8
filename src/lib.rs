//! Terminal front-end for two external file engines: an AES-128 encryption tool
//! and a Huffman compression tool.
//!
//! The crate contains no cryptography and no compression. It validates a
//! request, launches the right engine with a positional command line, paces a
//! progress gauge while the engine runs, and turns the exit code and stderr into
//! an [`model::Outcome`].

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod telemetry;
#[cfg(feature = "tui")]
pub mod tui;
