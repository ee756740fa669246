//! # Ready-to-use event extraction pipeline
//!
//! Based on a pretrained joint information extraction checkpoint, a ready to use end-to-end
//! pipeline is available as part of this crate:
//!
//! #### Event extraction
//! Extracts entity mentions, event triggers and argument roles from raw text. The heavy lifting
//! (sequence labeling and joint decoding of the information graph) is delegated to the pretrained
//! network; the pipeline contributes the word tokenization, the numberization into padded
//! sub-word piece arrays and the resolution of the decoded graph into labeled mentions.
//!
//! ```no_run
//! use rust_oneie::pipelines::event_extraction::EventExtractionModel;
//! # fn main() -> anyhow::Result<()> {
//! let model = EventExtractionModel::new(Default::default())?;
//!
//! let input = ["John resigned from his position at Acme in New York ."];
//! for sentence in model.predict(&input)? {
//!     println!("{sentence}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod event_extraction;
