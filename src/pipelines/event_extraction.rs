// Copyright 2020, Blender Lab, University of Illinois Urbana-Champaign
// Copyright 2019-2021 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Event extraction pipeline
//! Extracts entity mentions, event triggers and argument roles from raw text with a pretrained
//! joint extraction model. The pipeline chains three lightweight steps around the external
//! network: word tokenization with offsets, numberization into padded sub-word piece arrays and
//! resolution of the decoded graph into human-readable mentions.
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
//! Output: \
//! ```text
//! Document: doc-0
//! Entities:
//!   John (PER) [0-1]
//!   Acme (ORG) [6-7]
//!   New York (GPE) [8-10]
//! Triggers:
//!   resigned (Personnel:End-Position) [1-2]
//! Roles:
//!   resigned -> John (Person)
//!   resigned -> Acme (Entity)
//! ```

use crate::common::error::RustOneIeError;
use crate::oneie::{EventGraph, OneIeConfig, OneIeModel};
use crate::resources::ResourceProvider;
use crate::Config;
use rust_tokenizers::tokenizer::{BertTokenizer, Tokenizer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tch::{Device, Tensor};

#[cfg(feature = "remote")]
use crate::{
    oneie::{OneIeConfigResources, OneIeModelResources, OneIeVocabResources},
    resources::RemoteResource,
};

/// Default capacity of the padded sub-word piece arrays, used when the model configuration does
/// not provide one.
pub const DEFAULT_MAX_LENGTH: usize = 200;

const CLS_PIECE: &str = "[CLS]";
const SEP_PIECE: &str = "[SEP]";
const PAD_PIECE: &str = "[PAD]";
const UNK_PIECE: &str = "[UNK]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// # Word token produced by `tokenize_into_words`
pub struct WordToken {
    /// Surface text of the word
    pub text: String,
    /// Start offset (a word-index position, not a character position)
    pub start: usize,
    /// End offset (word-index position, exclusive)
    pub end: usize,
}

/// Splits raw text into word tokens with offsets.
///
/// Words are whitespace-separated chunks with leading and trailing ASCII punctuation peeled off
/// into tokens of their own (interior punctuation stays attached). Offsets are word-index
/// positions: token `i` spans `[i, i + 1)`.
pub fn tokenize_into_words(text: &str) -> Vec<WordToken> {
    let mut words = Vec::new();
    for chunk in text.split_whitespace() {
        for part in split_punctuation(chunk) {
            let position = words.len();
            words.push(WordToken {
                text: part,
                start: position,
                end: position + 1,
            });
        }
    }
    words
}

fn split_punctuation(chunk: &str) -> Vec<String> {
    let chars = chunk.chars().collect::<Vec<char>>();
    let mut core_start = 0;
    let mut core_end = chars.len();
    while core_start < core_end && chars[core_start].is_ascii_punctuation() {
        core_start += 1;
    }
    while core_end > core_start && chars[core_end - 1].is_ascii_punctuation() {
        core_end -= 1;
    }
    let mut parts = Vec::new();
    for character in &chars[..core_start] {
        parts.push(character.to_string());
    }
    if core_start < core_end {
        parts.push(chars[core_start..core_end].iter().collect());
    }
    for character in &chars[core_end..] {
        parts.push(character.to_string());
    }
    parts
}

#[derive(Debug, Clone)]
/// # One sentence numberized into the arrays the external model expects
pub struct Instance {
    /// Document identifier for the sentence
    pub doc_id: String,
    /// Word tokens of the sentence
    pub tokens: Vec<WordToken>,
    /// Composite identifiers (`docid:start-end`) for each word token
    pub token_ids: Vec<String>,
    /// Flat list of sub-word pieces over all word tokens
    pub pieces: Vec<String>,
    /// Piece ids wrapped with the sequence markers and padded to the capacity
    pub piece_idxs: Vec<i64>,
    /// Number of sub-word pieces for each word token
    pub token_lens: Vec<usize>,
    /// Attention mask, 1 for the markers and real pieces and 0 for padding
    pub attention_mask: Vec<i64>,
}

impl Instance {
    /// Numberize a tokenized sentence into padded piece id and attention mask arrays.
    ///
    /// Each word token is split into its WordPiece pieces (a word without any piece in the
    /// vocabulary is represented by the unknown piece so that token/piece alignment is kept).
    /// The flattened pieces are wrapped with the classification and separator markers, converted
    /// to ids and padded to `max_length`.
    ///
    /// # Arguments
    ///
    /// * `doc_id` - Document identifier used for the composite token identifiers
    /// * `tokens` - Word tokens as produced by `tokenize_into_words`
    /// * `tokenizer` - WordPiece tokenizer sharing the vocabulary of the pretrained encoder
    /// * `max_length` - Capacity of the padded arrays
    ///
    /// # Returns
    ///
    /// * `Instance` ready for batching, or a `ValueError` if the pieces do not fit the capacity
    pub fn numberize(
        doc_id: &str,
        tokens: &[WordToken],
        tokenizer: &BertTokenizer,
        max_length: usize,
    ) -> Result<Instance, RustOneIeError> {
        let mut pieces: Vec<String> = Vec::new();
        let mut token_lens = Vec::with_capacity(tokens.len());
        for token in tokens {
            let mut word_pieces = tokenizer.tokenize(&token.text);
            if word_pieces.is_empty() {
                word_pieces.push(UNK_PIECE.to_string());
            }
            token_lens.push(word_pieces.len());
            pieces.extend(word_pieces);
        }
        if pieces.len() + 2 > max_length {
            return Err(RustOneIeError::ValueError(format!(
                "Input {doc_id} yields {} sub-word pieces (sequence markers included), exceeding the capacity of {max_length}",
                pieces.len() + 2
            )));
        }

        let marker_idxs = tokenizer.convert_tokens_to_ids(&[
            CLS_PIECE.to_string(),
            SEP_PIECE.to_string(),
            PAD_PIECE.to_string(),
        ]);
        let (cls_id, sep_id, pad_id) = (marker_idxs[0], marker_idxs[1], marker_idxs[2]);

        let mut piece_idxs = Vec::with_capacity(max_length);
        piece_idxs.push(cls_id);
        piece_idxs.extend(tokenizer.convert_tokens_to_ids(&pieces));
        piece_idxs.push(sep_id);
        let mut attention_mask = vec![1; piece_idxs.len()];
        piece_idxs.resize(max_length, pad_id);
        attention_mask.resize(max_length, 0);

        let token_ids = tokens
            .iter()
            .map(|token| format!("{doc_id}:{}-{}", token.start, token.end))
            .collect();

        Ok(Instance {
            doc_id: doc_id.to_string(),
            tokens: tokens.to_vec(),
            token_ids,
            pieces,
            piece_idxs,
            token_lens,
            attention_mask,
        })
    }
}

#[derive(Debug)]
/// # Batch of numberized instances stacked into the tensor shapes the external model expects
pub struct Batch {
    /// Document identifiers of the batched instances
    pub doc_ids: Vec<String>,
    /// int64 tensor of shape `[batch, max_length]` with padded piece ids
    pub piece_idxs: Tensor,
    /// int64 tensor of shape `[batch, max_length]` with the attention masks
    pub attention_masks: Tensor,
    /// int64 tensor of shape `[batch, max_tokens]` with per-token piece counts, zero-padded
    pub token_lens: Tensor,
    /// int64 tensor of shape `[batch]` with the number of word tokens per instance
    pub token_nums: Tensor,
}

impl Batch {
    /// Stack numberized instances into parallel tensors on the target device.
    pub fn from_instances(instances: &[Instance], device: Device) -> Result<Batch, RustOneIeError> {
        if instances.is_empty() {
            return Err(RustOneIeError::ValueError(
                "Cannot build a batch from an empty instance list".to_string(),
            ));
        }
        let max_tokens = instances
            .iter()
            .map(|instance| instance.token_lens.len())
            .max()
            .unwrap();

        let piece_idxs = instances
            .iter()
            .map(|instance| Tensor::from_slice(instance.piece_idxs.as_slice()))
            .collect::<Vec<_>>();
        let attention_masks = instances
            .iter()
            .map(|instance| Tensor::from_slice(instance.attention_mask.as_slice()))
            .collect::<Vec<_>>();
        let token_lens = instances
            .iter()
            .map(|instance| {
                let mut lens = instance
                    .token_lens
                    .iter()
                    .map(|&length| length as i64)
                    .collect::<Vec<i64>>();
                lens.resize(max_tokens, 0);
                Tensor::from_slice(lens.as_slice())
            })
            .collect::<Vec<_>>();
        let token_nums = instances
            .iter()
            .map(|instance| instance.token_lens.len() as i64)
            .collect::<Vec<i64>>();

        Ok(Batch {
            doc_ids: instances
                .iter()
                .map(|instance| instance.doc_id.clone())
                .collect(),
            piece_idxs: Tensor::stack(piece_idxs.as_slice(), 0).to(device),
            attention_masks: Tensor::stack(attention_masks.as_slice(), 0).to(device),
            token_lens: Tensor::stack(token_lens.as_slice(), 0).to(device),
            token_nums: Tensor::from_slice(token_nums.as_slice()).to(device),
        })
    }
}

/// # Configuration for EventExtractionModel
/// Contains information regarding the model to load and device to place the model on.
pub struct EventExtractionConfig {
    /// Model weights resource (a traced module export)
    pub model_resource: Box<dyn ResourceProvider + Send>,
    /// Config resource (label vocabularies and pre-processing settings)
    pub config_resource: Box<dyn ResourceProvider + Send>,
    /// Vocab resource (WordPiece vocabulary of the pretrained encoder)
    pub vocab_resource: Box<dyn ResourceProvider + Send>,
    /// Automatically lower case all input upon tokenization (assumes a lower-cased model)
    pub lower_case: bool,
    /// Flag indicating if the tokenizer should strip accents (normalization)
    pub strip_accents: Option<bool>,
    /// Device to place the model on (default: CUDA/GPU when available)
    pub device: Device,
}

impl EventExtractionConfig {
    /// Instantiate a new event extraction configuration.
    ///
    /// # Arguments
    ///
    /// * `model_resource` - The `ResourceProvider` pointing to the traced module to load (e.g. model.pt)
    /// * `config_resource` - The `ResourceProvider` pointing to the model configuration to load (e.g. config.json)
    /// * `vocab_resource` - The `ResourceProvider` pointing to the tokenizer's vocabulary to load (e.g. vocab.txt)
    /// * `lower_case` - A `bool` indicating whether the tokenizer should lower case all input (in case of a lower-cased model)
    /// * `strip_accents` - Optional flag indicating if the tokenizer should strip accents
    pub fn new<RM, RC, RV>(
        model_resource: RM,
        config_resource: RC,
        vocab_resource: RV,
        lower_case: bool,
        strip_accents: impl Into<Option<bool>>,
    ) -> EventExtractionConfig
    where
        RM: ResourceProvider + Send + 'static,
        RC: ResourceProvider + Send + 'static,
        RV: ResourceProvider + Send + 'static,
    {
        EventExtractionConfig {
            model_resource: Box::new(model_resource),
            config_resource: Box::new(config_resource),
            vocab_resource: Box::new(vocab_resource),
            lower_case,
            strip_accents: strip_accents.into(),
            device: Device::cuda_if_available(),
        }
    }
}

#[cfg(feature = "remote")]
impl Default for EventExtractionConfig {
    /// Provides the default English joint extraction checkpoint
    fn default() -> EventExtractionConfig {
        EventExtractionConfig::new(
            RemoteResource::from_pretrained(OneIeModelResources::ONEIE_EN),
            RemoteResource::from_pretrained(OneIeConfigResources::ONEIE_EN),
            RemoteResource::from_pretrained(OneIeVocabResources::ONEIE_EN),
            false,
            None,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// # Entity mention resolved from the output graph
pub struct Entity {
    /// Surface text of the mention (span tokens joined with spaces)
    pub text: String,
    /// Entity type label (e.g. PER, GPE)
    pub label: String,
    /// Start of the span (word-token index)
    pub start: usize,
    /// End of the span (word-token index, exclusive)
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// # Event trigger resolved from the output graph
pub struct Trigger {
    /// Surface text of the trigger span
    pub text: String,
    /// Event type label (e.g. Personnel:End-Position)
    pub label: String,
    /// Start of the span (word-token index)
    pub start: usize,
    /// End of the span (word-token index, exclusive)
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// # Argument role linking a trigger to an entity mention
pub struct Role {
    /// Index of the trigger in the sentence's trigger list
    pub trigger_index: usize,
    /// Index of the entity in the sentence's entity list
    pub entity_index: usize,
    /// Role label (e.g. Victim)
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// # Entities, triggers and roles extracted from one sentence
///
/// Role indices are validated against the entity and trigger lists when the value is built from
/// an output graph.
pub struct SentenceEvents {
    /// Document identifier for the sentence
    pub doc_id: String,
    /// Entity mentions
    pub entities: Vec<Entity>,
    /// Event triggers
    pub triggers: Vec<Trigger>,
    /// Argument roles
    pub roles: Vec<Role>,
}

impl SentenceEvents {
    /// Resolve an output graph against the sentence tokens and the label vocabularies.
    ///
    /// Bounds-checks every span and role index and resolves the integer type codes to labels.
    /// Errors indicate an inconsistency between the checkpoint and its configuration file.
    pub fn from_graph(
        doc_id: &str,
        tokens: &[WordToken],
        graph: &EventGraph,
        entity_labels: &HashMap<i64, String>,
        event_labels: &HashMap<i64, String>,
        role_labels: &HashMap<i64, String>,
    ) -> Result<SentenceEvents, RustOneIeError> {
        let entities = graph
            .entities
            .iter()
            .map(|&(start, end, type_code)| {
                Ok(Entity {
                    text: span_text(tokens, start, end, doc_id)?,
                    label: resolve_label(entity_labels, type_code, "entity")?,
                    start,
                    end,
                })
            })
            .collect::<Result<Vec<_>, RustOneIeError>>()?;
        let triggers = graph
            .triggers
            .iter()
            .map(|&(start, end, type_code)| {
                Ok(Trigger {
                    text: span_text(tokens, start, end, doc_id)?,
                    label: resolve_label(event_labels, type_code, "event")?,
                    start,
                    end,
                })
            })
            .collect::<Result<Vec<_>, RustOneIeError>>()?;
        let roles = graph
            .roles
            .iter()
            .map(|&(trigger_index, entity_index, type_code)| {
                if trigger_index >= triggers.len() {
                    return Err(RustOneIeError::ValueError(format!(
                        "Role references trigger {trigger_index} but {doc_id} holds {} triggers",
                        triggers.len()
                    )));
                }
                if entity_index >= entities.len() {
                    return Err(RustOneIeError::ValueError(format!(
                        "Role references entity {entity_index} but {doc_id} holds {} entities",
                        entities.len()
                    )));
                }
                Ok(Role {
                    trigger_index,
                    entity_index,
                    label: resolve_label(role_labels, type_code, "role")?,
                })
            })
            .collect::<Result<Vec<_>, RustOneIeError>>()?;

        Ok(SentenceEvents {
            doc_id: doc_id.to_string(),
            entities,
            triggers,
            roles,
        })
    }

    /// Returns true if no mention of any kind was extracted.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() & self.triggers.is_empty() & self.roles.is_empty()
    }
}

impl fmt::Display for SentenceEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document: {}", self.doc_id)?;
        writeln!(f, "Entities:")?;
        for entity in &self.entities {
            writeln!(
                f,
                "  {} ({}) [{}-{}]",
                entity.text, entity.label, entity.start, entity.end
            )?;
        }
        writeln!(f, "Triggers:")?;
        for trigger in &self.triggers {
            writeln!(
                f,
                "  {} ({}) [{}-{}]",
                trigger.text, trigger.label, trigger.start, trigger.end
            )?;
        }
        writeln!(f, "Roles:")?;
        for role in &self.roles {
            let trigger = self.triggers.get(role.trigger_index);
            let entity = self.entities.get(role.entity_index);
            if let (Some(trigger), Some(entity)) = (trigger, entity) {
                writeln!(f, "  {} -> {} ({})", trigger.text, entity.text, role.label)?;
            }
        }
        Ok(())
    }
}

fn span_text(
    tokens: &[WordToken],
    start: usize,
    end: usize,
    doc_id: &str,
) -> Result<String, RustOneIeError> {
    if start >= end || end > tokens.len() {
        return Err(RustOneIeError::ValueError(format!(
            "Span ({start}, {end}) outside of the {} tokens of {doc_id}",
            tokens.len()
        )));
    }
    Ok(tokens[start..end]
        .iter()
        .map(|token| token.text.as_str())
        .collect::<Vec<&str>>()
        .join(" "))
}

fn resolve_label(
    mapping: &HashMap<i64, String>,
    type_code: i64,
    kind: &str,
) -> Result<String, RustOneIeError> {
    mapping.get(&type_code).cloned().ok_or_else(|| {
        RustOneIeError::InvalidConfigurationError(format!(
            "No {kind} label for type code {type_code} in the model configuration"
        ))
    })
}

/// # EventExtractionModel for entity, trigger and argument role extraction
pub struct EventExtractionModel {
    tokenizer: BertTokenizer,
    model: OneIeModel,
    entity_labels: HashMap<i64, String>,
    event_labels: HashMap<i64, String>,
    role_labels: HashMap<i64, String>,
    max_length: usize,
}

impl EventExtractionModel {
    /// Build a new `EventExtractionModel`
    ///
    /// # Arguments
    ///
    /// * `config` - `EventExtractionConfig` object containing the resource references (model, vocabulary, configuration) and device placement (CPU/GPU)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use rust_oneie::pipelines::event_extraction::EventExtractionModel;
    ///
    /// let model = EventExtractionModel::new(Default::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: EventExtractionConfig) -> Result<EventExtractionModel, RustOneIeError> {
        let config_path = config.config_resource.get_local_path()?;
        let vocab_path = config.vocab_resource.get_local_path()?;
        let weights_path = config.model_resource.get_local_path()?;

        let model_config = OneIeConfig::from_file(config_path);
        let lower_case = model_config.lower_case.unwrap_or(config.lower_case);
        let strip_accents = model_config
            .strip_accents
            .or(config.strip_accents)
            .unwrap_or(lower_case);
        let tokenizer =
            BertTokenizer::from_file(vocab_path.to_str().unwrap(), lower_case, strip_accents)?;
        let model = OneIeModel::new(weights_path, config.device)?;
        let max_length = model_config
            .max_length
            .map(|value| value as usize)
            .unwrap_or(DEFAULT_MAX_LENGTH);

        Ok(EventExtractionModel {
            tokenizer,
            model,
            entity_labels: model_config.entity_id2label,
            event_labels: model_config.event_id2label,
            role_labels: model_config.role_id2label,
            max_length,
        })
    }

    /// Get a reference to the model tokenizer.
    pub fn get_tokenizer(&self) -> &BertTokenizer {
        &self.tokenizer
    }

    /// Extract entities, triggers and roles from a list of texts.
    ///
    /// Inputs are processed one sentence at a time (the external module operates on
    /// single-instance batches). Document identifiers default to the input position.
    ///
    /// # Arguments
    ///
    /// * `input` - `&[&str]` Array of texts to extract events from.
    ///
    /// # Returns
    ///
    /// * `Vec<SentenceEvents>` with the resolved mentions for each input provided
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use rust_oneie::pipelines::event_extraction::EventExtractionModel;
    /// let model = EventExtractionModel::new(Default::default())?;
    /// let input = ["John resigned from his position at Acme in New York ."];
    /// let output = model.predict(&input)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn predict<S>(&self, input: &[S]) -> Result<Vec<SentenceEvents>, RustOneIeError>
    where
        S: AsRef<str>,
    {
        let mut output = Vec::with_capacity(input.len());
        for (index, text) in input.iter().enumerate() {
            output.push(self.extract_events(&format!("doc-{index}"), text.as_ref())?);
        }
        Ok(output)
    }

    /// Extract entities, triggers and roles from a single text with an explicit document identifier.
    pub fn extract_events(
        &self,
        doc_id: &str,
        text: &str,
    ) -> Result<SentenceEvents, RustOneIeError> {
        let tokens = tokenize_into_words(text);
        if tokens.is_empty() {
            return Ok(SentenceEvents {
                doc_id: doc_id.to_string(),
                entities: vec![],
                triggers: vec![],
                roles: vec![],
            });
        }
        let instance = Instance::numberize(doc_id, &tokens, &self.tokenizer, self.max_length)?;
        let batch = Batch::from_instances(std::slice::from_ref(&instance), self.model.device())?;
        let graph = self.model.predict(
            &batch.piece_idxs,
            &batch.attention_masks,
            &batch.token_lens,
            &batch.token_nums,
        )?;
        SentenceEvents::from_graph(
            doc_id,
            &tokens,
            &graph,
            &self.entity_labels,
            &self.event_labels,
            &self.role_labels,
        )
    }
}
