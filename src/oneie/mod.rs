//! # OneIE, a joint neural model for information extraction (Lin et al.)
//!
//! Holds the configuration and inference wrapper for a pretrained joint
//! event-extraction checkpoint. The network itself (architecture, training and
//! joint decoding over the entity/trigger/role graph) lives entirely inside a
//! traced module export and is invoked as a black box: this module fixes the
//! calling convention and reads back the decoded graph.
//!
//! # Model set-up and pre-trained weights loading
//!
//! The required resources are:
//! - Configuration file expected to have a structure following the [OneIeConfig](OneIeConfig)
//!   definition, carrying the label vocabularies used to resolve type codes
//! - Model weights, a traced module export
//! - `BertVocab` WordPiece vocabulary used by the encoder

mod oneie_model;

pub use oneie_model::{
    EventGraph, OneIeConfig, OneIeConfigResources, OneIeModel, OneIeModelResources,
    OneIeVocabResources,
};
