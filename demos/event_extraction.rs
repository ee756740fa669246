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

use anyhow::bail;
use rust_oneie::pipelines::event_extraction::{EventExtractionConfig, EventExtractionModel};
use rust_oneie::resources::LocalResource;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    //    Resources paths
    let mut home: PathBuf = dirs::home_dir().unwrap();
    home.push("rustoneie");
    home.push("oneie-en");
    let config_path = home.as_path().join("config.json");
    let vocab_path = home.as_path().join("vocab.txt");
    let weights_path = home.as_path().join("model.pt");

    if !config_path.is_file() | !vocab_path.is_file() | !weights_path.is_file() {
        bail!(
            "Could not find required resources to run example. \
             Place the traced module (model.pt), configuration (config.json) and vocabulary \
             (vocab.txt) of a pretrained checkpoint under {:?}",
            home
        );
    }

    //    Set-up model
    let config = EventExtractionConfig::new(
        LocalResource::from(weights_path),
        LocalResource::from(config_path),
        LocalResource::from(vocab_path),
        false,
        None,
    );
    let model = EventExtractionModel::new(config)?;

    //    Define input
    let input = [
        "John resigned from his position at Acme in New York .",
        "The attack in Baghdad killed three soldiers .",
    ];

    //    Run model
    let output = model.predict(&input)?;
    for sentence in output {
        println!("{sentence}");
    }

    Ok(())
}
