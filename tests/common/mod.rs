//! Shared test corpus: two words "Foo" (10) and "Bar" (11) over six chars
//! (1 to 6), with a transcription and a phonetic layer on chars and a text
//! layer on words.

#![allow(dead_code)]

use layersearch::position::{BoundaryTable, PositionData};
use layersearch::{Corpus, CorpusDescription};
use rustc_hash::FxHashMap;

pub const DESCRIPTION: &str = r#"{
    "nodeTypes": ["char", "word"],
    "firstNodes": {"char": 1, "word": 10},
    "layers": {
        "char": {
            "trans": {"textLength": 6, "positionKey": "c"},
            "phono": {"textLength": 6, "positionKey": "c"}
        },
        "word": {
            "text": {"textLength": 6, "positionKey": "w"}
        }
    }
}"#;

pub const UP: &[u8] = b"1-3\t10\n4-6\t11\n";

fn texts() -> FxHashMap<(String, String), String> {
    let mut texts = FxHashMap::default();
    for (t, l, text) in [
        ("char", "trans", "foobar"),
        ("char", "phono", "FOOBAR"),
        ("word", "text", "FooBar"),
    ] {
        texts.insert((t.to_string(), l.to_string()), text.to_string());
    }
    texts
}

pub fn direct_positions() -> PositionData {
    let mut tables = FxHashMap::default();
    tables.insert("c".to_string(), (1..=6).map(Some).collect());
    tables.insert(
        "w".to_string(),
        vec![Some(10), Some(10), Some(10), Some(11), Some(11), Some(11)],
    );
    PositionData::Direct(tables)
}

pub fn derived_positions() -> PositionData {
    let mut tables = FxHashMap::default();
    tables.insert("c".to_string(), BoundaryTable::new(vec![0, 0, 1, 2, 3, 4, 5, 6]));
    tables.insert("w".to_string(), BoundaryTable::new(vec![9, 0, 3, 6]));
    PositionData::Derived(tables)
}

pub fn create_corpus(positions: PositionData) -> Corpus {
    let description: CorpusDescription = serde_json::from_str(DESCRIPTION).unwrap();
    Corpus::build(description, texts(), UP, positions).unwrap()
}
