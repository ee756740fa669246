//! Ready-to-use event extraction pipeline for Rust
//!
//! This repository exposes an end-to-end event extraction pipeline built on top of a pretrained
//! joint information extraction model (a traced module export invoked through the [tch-rs](https://github.com/LaurentMazare/tch-rs)
//! bindings to the libtorch C++ API). The network architecture, training and joint decoding are
//! entirely delegated to the pretrained module; this crate contributes the glue around it:
//! - word tokenization of raw text with offsets
//! - numberization of word tokens into padded sub-word piece id and attention mask arrays
//! - batching of a single example into the tensor shapes the module expects
//! - resolution of the decoded entity/trigger/role graph into human-readable mentions
//!
//! # Quick Start
//!
//! ```no_run
//! use rust_oneie::pipelines::event_extraction::EventExtractionModel;
//! # fn main() -> anyhow::Result<()> {
//! let model = EventExtractionModel::new(Default::default())?;
//!
//! let input = ["John resigned from his position at Acme in New York ."];
//! let output = model.predict(&input)?;
//! for sentence in output {
//!     println!("{sentence}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Loading pretrained checkpoints
//!
//! The pipeline requires three resources: the traced module export, a configuration file carrying
//! the label vocabularies, and the WordPiece vocabulary of the encoder. These can be local files
//! ([resources::LocalResource]) or remote files downloaded and cached on demand
//! ([resources::RemoteResource], available with the default `remote` feature).

pub mod common;
pub mod oneie;
pub mod pipelines;

pub use common::error::RustOneIeError;
pub use common::{config::Config, resources};
