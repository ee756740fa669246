// Copyright 2020 Ying Lin, Blender Lab, University of Illinois Urbana-Champaign
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

use crate::common::error::RustOneIeError;
use crate::Config;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tch::{no_grad, CModule, Device, IValue, Tensor};

/// # OneIE Pretrained model weight files
pub struct OneIeModelResources;

/// # OneIE Pretrained model config files
pub struct OneIeConfigResources;

/// # OneIE Pretrained model vocab files
pub struct OneIeVocabResources;

impl OneIeModelResources {
    /// Shared under Apache 2.0 license at <https://huggingface.co/guillaume-be/oneie-en>. Modified with conversion to a traced module.
    pub const ONEIE_EN: (&'static str, &'static str) = (
        "oneie-en/model",
        "https://huggingface.co/guillaume-be/oneie-en/resolve/main/traced_model.pt",
    );
}

impl OneIeConfigResources {
    /// Shared under Apache 2.0 license at <https://huggingface.co/guillaume-be/oneie-en>. Modified with conversion to a traced module.
    pub const ONEIE_EN: (&'static str, &'static str) = (
        "oneie-en/config",
        "https://huggingface.co/guillaume-be/oneie-en/resolve/main/config.json",
    );
}

impl OneIeVocabResources {
    /// Shared under Apache 2.0 license at <https://huggingface.co/guillaume-be/oneie-en>. Modified with conversion to a traced module.
    pub const ONEIE_EN: (&'static str, &'static str) = (
        "oneie-en/vocab",
        "https://huggingface.co/guillaume-be/oneie-en/resolve/main/vocab.txt",
    );
}

/// # OneIE model configuration
/// Defines the pre-processing settings and the label vocabularies used to resolve the integer
/// type codes found in the output graph.
#[derive(Debug, Serialize, Deserialize)]
pub struct OneIeConfig {
    /// Mapping from entity type codes to entity labels (e.g. `PER`, `GPE`)
    pub entity_id2label: HashMap<i64, String>,
    /// Mapping from event type codes to trigger labels (e.g. `Personnel:End-Position`)
    pub event_id2label: HashMap<i64, String>,
    /// Mapping from role type codes to argument role labels (e.g. `Victim`)
    pub role_id2label: HashMap<i64, String>,
    /// Capacity of the padded sub-word piece arrays (defaults to 200)
    pub max_length: Option<i64>,
    /// Flag indicating if the encoder expects lower-cased input
    pub lower_case: Option<bool>,
    /// Flag indicating if the tokenizer should strip accents (normalization)
    pub strip_accents: Option<bool>,
}

impl Config for OneIeConfig {}

/// # Information graph decoded by the model for one sentence
///
/// Spans are expressed over word-token indices with an exclusive end. The graph is produced
/// entirely by the external module; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventGraph {
    /// Entity mentions as `(start, end, type_code)` tuples
    pub entities: Vec<(usize, usize, i64)>,
    /// Event triggers as `(start, end, type_code)` tuples
    pub triggers: Vec<(usize, usize, i64)>,
    /// Argument roles as `(trigger_index, entity_index, type_code)` tuples
    pub roles: Vec<(usize, usize, i64)>,
}

/// # OneIeModel
/// Thin wrapper around the traced module holding the pretrained joint extraction network.
///
/// The module calling convention is fixed:
/// - inputs: `piece_idxs` (int64, `[1, max_length]`), `attention_mask` (int64, `[1, max_length]`),
///   `token_lens` (int64, `[1, token_num]`, sub-word pieces per word token) and `token_num`
///   (int64, `[1]`)
/// - output: a 3-tuple of int64 tensors of shape `[n, 3]` holding the entity, trigger and role
///   tuples of the decoded graph (an empty tensor stands for an empty tuple list)
pub struct OneIeModel {
    module: CModule,
    device: Device,
}

impl OneIeModel {
    /// Build a new `OneIeModel` by loading a traced module export.
    ///
    /// # Arguments
    ///
    /// * `weights_path` - Path to the traced module file
    /// * `device` - Device to place the module on (CPU/GPU)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_oneie::oneie::OneIeModel;
    /// use tch::Device;
    /// # fn main() -> anyhow::Result<()> {
    /// let model = OneIeModel::new("path/to/model.pt", Device::cuda_if_available())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new<P: AsRef<Path>>(weights_path: P, device: Device) -> Result<Self, RustOneIeError> {
        let module = CModule::load_on_device(weights_path, device)?;
        Ok(OneIeModel { module, device })
    }

    /// Returns the device the module is placed on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Run the pretrained network on a single-instance batch and read back the decoded graph.
    ///
    /// # Arguments
    ///
    /// * `piece_idxs` - int64 tensor of shape `[1, max_length]` with padded sub-word piece ids
    /// * `attention_mask` - int64 tensor of shape `[1, max_length]`, 1 for real pieces and 0 for padding
    /// * `token_lens` - int64 tensor of shape `[1, token_num]` with sub-word piece counts per word token
    /// * `token_num` - int64 tensor of shape `[1]` with the number of word tokens
    ///
    /// # Returns
    ///
    /// * `EventGraph` with the entity, trigger and role tuples decoded by the module
    pub fn predict(
        &self,
        piece_idxs: &Tensor,
        attention_mask: &Tensor,
        token_lens: &Tensor,
        token_num: &Tensor,
    ) -> Result<EventGraph, RustOneIeError> {
        let batch_size = *piece_idxs.size().first().unwrap_or(&0);
        if batch_size != 1 {
            return Err(RustOneIeError::ValueError(format!(
                "The extraction module only supports single-instance batches, got a batch of {batch_size}"
            )));
        }
        let inputs = [
            IValue::Tensor(piece_idxs.to(self.device)),
            IValue::Tensor(attention_mask.to(self.device)),
            IValue::Tensor(token_lens.to(self.device)),
            IValue::Tensor(token_num.to(self.device)),
        ];
        let output = no_grad(|| self.module.forward_is(&inputs))?;

        let values: [IValue; 3] = match output {
            IValue::Tuple(values) => values.try_into().map_err(|values: Vec<IValue>| {
                RustOneIeError::ValueError(format!(
                    "Expected a 3-tuple (entities, triggers, roles) from the extraction module, got a tuple of {}",
                    values.len()
                ))
            })?,
            _ => {
                return Err(RustOneIeError::ValueError(
                    "Expected a tuple output from the extraction module".to_string(),
                ))
            }
        };
        let [entities, triggers, roles] = values;

        Ok(EventGraph {
            entities: span_tuples(&into_tensor(entities)?, "entities")?,
            triggers: span_tuples(&into_tensor(triggers)?, "triggers")?,
            roles: link_tuples(&into_tensor(roles)?, "roles")?,
        })
    }
}

fn into_tensor(value: IValue) -> Result<Tensor, RustOneIeError> {
    match value {
        IValue::Tensor(tensor) => Ok(tensor),
        _ => Err(RustOneIeError::ValueError(
            "Expected tensor fields in the extraction module output".to_string(),
        )),
    }
}

fn tuple_rows(tensor: &Tensor, name: &str) -> Result<Vec<(i64, i64, i64)>, RustOneIeError> {
    let size = tensor.size();
    // traced modules commonly emit a 1-D empty tensor for an empty tuple list
    if size.iter().any(|&dim| dim == 0) {
        return Ok(vec![]);
    }
    if size.len() != 2 || size[1] != 3 {
        return Err(RustOneIeError::ValueError(format!(
            "Expected a [n, 3] tensor for {name}, got {size:?}"
        )));
    }
    let tensor = tensor.to(Device::Cpu);
    let mut rows = Vec::with_capacity(size[0] as usize);
    for idx in 0..size[0] {
        rows.push((
            tensor.int64_value(&[idx, 0]),
            tensor.int64_value(&[idx, 1]),
            tensor.int64_value(&[idx, 2]),
        ));
    }
    Ok(rows)
}

fn span_tuples(tensor: &Tensor, name: &str) -> Result<Vec<(usize, usize, i64)>, RustOneIeError> {
    tuple_rows(tensor, name)?
        .into_iter()
        .map(|(start, end, type_code)| {
            if start < 0 || end < start {
                return Err(RustOneIeError::ValueError(format!(
                    "Invalid span ({start}, {end}) in {name}"
                )));
            }
            Ok((start as usize, end as usize, type_code))
        })
        .collect()
}

// role tuples hold a trigger index and an entity index, not an ordered span
fn link_tuples(tensor: &Tensor, name: &str) -> Result<Vec<(usize, usize, i64)>, RustOneIeError> {
    tuple_rows(tensor, name)?
        .into_iter()
        .map(|(trigger_index, entity_index, type_code)| {
            if trigger_index < 0 || entity_index < 0 {
                return Err(RustOneIeError::ValueError(format!(
                    "Invalid link ({trigger_index}, {entity_index}) in {name}"
                )));
            }
            Ok((trigger_index as usize, entity_index as usize, type_code))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_links_accept_any_index_ordering() -> anyhow::Result<()> {
        // a link from the second trigger to the first entity is valid model output
        let roles = Tensor::from_slice(&[1i64, 0, 2, 0, 1, 1]).view((2, 3));

        let links = link_tuples(&roles, "roles")?;

        assert_eq!(links, [(1, 0, 2), (0, 1, 1)]);
        Ok(())
    }

    #[test]
    fn role_links_reject_negative_indices() -> anyhow::Result<()> {
        let roles = Tensor::from_slice(&[-1i64, 0, 1]).view((1, 3));

        let output = link_tuples(&roles, "roles");

        assert!(matches!(output, Err(RustOneIeError::ValueError(_))));
        Ok(())
    }

    #[test]
    fn span_tuples_reject_reversed_spans() -> anyhow::Result<()> {
        let triggers = Tensor::from_slice(&[1i64, 0, 2]).view((1, 3));

        let output = span_tuples(&triggers, "triggers");

        assert!(matches!(output, Err(RustOneIeError::ValueError(_))));
        Ok(())
    }

    #[test]
    fn empty_output_tensors_decode_to_empty_tuple_lists() -> anyhow::Result<()> {
        let empty = Tensor::from_slice::<i64>(&[]);

        assert!(span_tuples(&empty, "entities")?.is_empty());
        assert!(link_tuples(&empty, "roles")?.is_empty());
        Ok(())
    }
}
