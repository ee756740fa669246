use rust_oneie::oneie::EventGraph;
use rust_oneie::pipelines::event_extraction::{
    tokenize_into_words, Batch, Instance, SentenceEvents,
};
use rust_oneie::RustOneIeError;
use rust_tokenizers::tokenizer::BertTokenizer;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tch::Device;
use tempfile::TempDir;

const FIXTURE_VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "john", "resigned", "from", "acme", "in", "new",
    "york", "play", "##ing", ".", ",",
];

fn fixture_tokenizer() -> anyhow::Result<(TempDir, BertTokenizer)> {
    let tmp_dir = TempDir::new()?;
    let vocab_path: PathBuf = tmp_dir.path().join("vocab.txt");
    fs::write(&vocab_path, FIXTURE_VOCAB.join("\n"))?;
    let tokenizer = BertTokenizer::from_file(vocab_path.to_str().unwrap(), true, true)?;
    Ok((tmp_dir, tokenizer))
}

fn fixture_labels() -> (
    HashMap<i64, String>,
    HashMap<i64, String>,
    HashMap<i64, String>,
) {
    let entity_labels = HashMap::from([(1, String::from("PER")), (2, String::from("ORG")), (3, String::from("GPE"))]);
    let event_labels = HashMap::from([(1, String::from("Personnel:End-Position"))]);
    let role_labels = HashMap::from([(1, String::from("Person")), (2, String::from("Entity"))]);
    (entity_labels, event_labels, role_labels)
}

#[test]
fn tokenize_words_and_offsets() -> anyhow::Result<()> {
    let words = tokenize_into_words("John resigned from Acme, in New York.");

    let texts = words.iter().map(|word| word.text.as_str()).collect::<Vec<&str>>();
    assert_eq!(
        texts,
        ["John", "resigned", "from", "Acme", ",", "in", "New", "York", "."]
    );
    for (position, word) in words.iter().enumerate() {
        assert_eq!(word.start, position);
        assert_eq!(word.end, position + 1);
    }
    Ok(())
}

#[test]
fn tokenize_peels_wrapping_punctuation() -> anyhow::Result<()> {
    let words = tokenize_into_words("\"hello,\" (world)");

    let texts = words.iter().map(|word| word.text.as_str()).collect::<Vec<&str>>();
    assert_eq!(texts, ["\"", "hello", ",", "\"", "(", "world", ")"]);
    Ok(())
}

#[test]
fn tokenize_keeps_interior_punctuation() -> anyhow::Result<()> {
    let words = tokenize_into_words("state-of-the-art U.S. systems");

    let texts = words.iter().map(|word| word.text.as_str()).collect::<Vec<&str>>();
    assert_eq!(texts, ["state-of-the-art", "U.S", ".", "systems"]);
    Ok(())
}

#[test]
fn tokenize_empty_input() -> anyhow::Result<()> {
    assert!(tokenize_into_words("").is_empty());
    assert!(tokenize_into_words("   \t\n").is_empty());
    Ok(())
}

#[test]
fn numberize_builds_padded_arrays() -> anyhow::Result<()> {
    let (_tmp_dir, tokenizer) = fixture_tokenizer()?;
    let words = tokenize_into_words("John playing Quuxcorp");

    let instance = Instance::numberize("test-doc", &words, &tokenizer, 16)?;

    // john | play ##ing | [UNK]
    assert_eq!(instance.pieces, ["john", "play", "##ing", "[UNK]"]);
    assert_eq!(instance.token_lens, [1, 2, 1]);
    assert_eq!(
        instance.token_lens.iter().sum::<usize>(),
        instance.pieces.len()
    );

    assert_eq!(instance.piece_idxs.len(), 16);
    assert_eq!(instance.attention_mask.len(), 16);
    assert_eq!(
        instance.piece_idxs[..6],
        [2, 5, 12, 13, 1, 3] // [CLS] john play ##ing [UNK] [SEP]
    );
    assert!(instance.piece_idxs[6..].iter().all(|&id| id == 0));
    assert_eq!(instance.attention_mask[..6], [1, 1, 1, 1, 1, 1]);
    assert!(instance.attention_mask[6..].iter().all(|&value| value == 0));

    assert_eq!(
        instance.token_ids,
        ["test-doc:0-1", "test-doc:1-2", "test-doc:2-3"]
    );
    Ok(())
}

#[test]
fn numberize_falls_back_to_unknown_for_empty_piece_lists() -> anyhow::Result<()> {
    let (_tmp_dir, tokenizer) = fixture_tokenizer()?;
    // a control character survives word tokenization but is stripped by the
    // WordPiece tokenizer's text cleaning, yielding zero pieces for the token
    let words = tokenize_into_words("\u{1}");
    assert_eq!(words.len(), 1);

    let instance = Instance::numberize("test-doc", &words, &tokenizer, 8)?;

    assert_eq!(instance.pieces, ["[UNK]"]);
    assert_eq!(instance.token_lens, [1]);
    assert_eq!(instance.piece_idxs[..3], [2, 1, 3]); // [CLS] [UNK] [SEP]
    assert_eq!(instance.attention_mask[..3], [1, 1, 1]);
    Ok(())
}

#[test]
fn numberize_rejects_inputs_over_capacity() -> anyhow::Result<()> {
    let (_tmp_dir, tokenizer) = fixture_tokenizer()?;
    let words = tokenize_into_words("John resigned from Acme");

    let output = Instance::numberize("test-doc", &words, &tokenizer, 4);

    assert!(matches!(output, Err(RustOneIeError::ValueError(_))));
    Ok(())
}

#[test]
fn batch_stacks_instances_into_tensors() -> anyhow::Result<()> {
    let (_tmp_dir, tokenizer) = fixture_tokenizer()?;
    let first = Instance::numberize(
        "doc-0",
        &tokenize_into_words("John resigned from Acme ."),
        &tokenizer,
        16,
    )?;
    let second = Instance::numberize("doc-1", &tokenize_into_words("John playing"), &tokenizer, 16)?;

    let batch = Batch::from_instances(&[first, second], Device::Cpu)?;

    assert_eq!(batch.doc_ids, ["doc-0", "doc-1"]);
    assert_eq!(batch.piece_idxs.size(), [2, 16]);
    assert_eq!(batch.attention_masks.size(), [2, 16]);
    assert_eq!(batch.token_lens.size(), [2, 5]);
    assert_eq!(batch.token_nums.size(), [2]);
    assert_eq!(batch.token_nums.int64_value(&[0]), 5);
    assert_eq!(batch.token_nums.int64_value(&[1]), 2);
    // the shorter instance's piece counts are zero-padded
    assert_eq!(batch.token_lens.int64_value(&[1, 1]), 2);
    assert_eq!(batch.token_lens.int64_value(&[1, 2]), 0);
    Ok(())
}

#[test]
fn batch_rejects_empty_instance_list() -> anyhow::Result<()> {
    let output = Batch::from_instances(&[], Device::Cpu);
    assert!(matches!(output, Err(RustOneIeError::ValueError(_))));
    Ok(())
}

#[test]
fn graph_resolution() -> anyhow::Result<()> {
    let words = tokenize_into_words("John resigned from Acme in New York .");
    let (entity_labels, event_labels, role_labels) = fixture_labels();
    let graph = EventGraph {
        entities: vec![(0, 1, 1), (3, 4, 2), (5, 7, 3)],
        triggers: vec![(1, 2, 1)],
        roles: vec![(0, 0, 1), (0, 1, 2)],
    };

    let sentence = SentenceEvents::from_graph(
        "test-doc",
        &words,
        &graph,
        &entity_labels,
        &event_labels,
        &role_labels,
    )?;

    assert_eq!(sentence.entities.len(), 3);
    assert_eq!(sentence.entities[0].text, "John");
    assert_eq!(sentence.entities[0].label, "PER");
    assert_eq!(sentence.entities[2].text, "New York");
    assert_eq!(sentence.entities[2].label, "GPE");
    assert_eq!(sentence.triggers[0].text, "resigned");
    assert_eq!(sentence.triggers[0].label, "Personnel:End-Position");
    assert_eq!(sentence.roles.len(), 2);
    assert_eq!(sentence.roles[0].label, "Person");
    assert!(!sentence.is_empty());

    let rendered = sentence.to_string();
    assert!(rendered.contains("John (PER) [0-1]"));
    assert!(rendered.contains("New York (GPE) [5-7]"));
    assert!(rendered.contains("resigned (Personnel:End-Position) [1-2]"));
    assert!(rendered.contains("resigned -> John (Person)"));
    assert!(rendered.contains("resigned -> Acme (Entity)"));
    Ok(())
}

#[test]
fn graph_resolution_empty_graph() -> anyhow::Result<()> {
    let words = tokenize_into_words("John resigned .");
    let (entity_labels, event_labels, role_labels) = fixture_labels();

    let sentence = SentenceEvents::from_graph(
        "test-doc",
        &words,
        &EventGraph::default(),
        &entity_labels,
        &event_labels,
        &role_labels,
    )?;

    assert!(sentence.is_empty());
    Ok(())
}

#[test]
fn graph_resolution_rejects_out_of_bounds_span() -> anyhow::Result<()> {
    let words = tokenize_into_words("John resigned .");
    let (entity_labels, event_labels, role_labels) = fixture_labels();
    let graph = EventGraph {
        entities: vec![(2, 5, 1)],
        triggers: vec![],
        roles: vec![],
    };

    let output = SentenceEvents::from_graph(
        "test-doc",
        &words,
        &graph,
        &entity_labels,
        &event_labels,
        &role_labels,
    );

    assert!(matches!(output, Err(RustOneIeError::ValueError(_))));
    Ok(())
}

#[test]
fn graph_resolution_rejects_unknown_type_code() -> anyhow::Result<()> {
    let words = tokenize_into_words("John resigned .");
    let (entity_labels, event_labels, role_labels) = fixture_labels();
    let graph = EventGraph {
        entities: vec![(0, 1, 99)],
        triggers: vec![],
        roles: vec![],
    };

    let output = SentenceEvents::from_graph(
        "test-doc",
        &words,
        &graph,
        &entity_labels,
        &event_labels,
        &role_labels,
    );

    assert!(matches!(
        output,
        Err(RustOneIeError::InvalidConfigurationError(_))
    ));
    Ok(())
}

#[test]
fn graph_resolution_rejects_dangling_role() -> anyhow::Result<()> {
    let words = tokenize_into_words("John resigned .");
    let (entity_labels, event_labels, role_labels) = fixture_labels();
    let graph = EventGraph {
        entities: vec![(0, 1, 1)],
        triggers: vec![(1, 2, 1)],
        roles: vec![(0, 4, 1)],
    };

    let output = SentenceEvents::from_graph(
        "test-doc",
        &words,
        &graph,
        &entity_labels,
        &event_labels,
        &role_labels,
    );

    assert!(matches!(output, Err(RustOneIeError::ValueError(_))));
    Ok(())
}
