//! Corpus bundle loading
//!
//! A bundle is a directory holding
//!
//! ```text
//! corpus.json                 corpus description
//! up.tsv                      parent encoding
//! positions.json              position data (direct or derived layout)
//! texts/<type>.<layer>.txt    one file per layer
//! ```
//!
//! Any of these files may be gzip compressed, with a `.gz` suffix added
//! to its name.

use crate::corpus::{Corpus, CorpusDescription};
use crate::error::CorpusError;
use crate::position::PositionData;
use flate2::read::MultiGzDecoder;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DESCRIPTION_FILE: &str = "corpus.json";
pub const RELATION_FILE: &str = "up.tsv";
pub const POSITIONS_FILE: &str = "positions.json";
pub const TEXT_DIR: &str = "texts";

/// Raw corpus data read from disk
#[derive(Debug, Clone)]
pub struct CorpusBundle {
    pub description: CorpusDescription,
    pub texts: FxHashMap<(String, String), String>,
    pub up: Vec<u8>,
    pub positions: PositionData,
}

impl CorpusBundle {
    /// Read a bundle directory
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let dir = dir.as_ref();

        let description: CorpusDescription =
            serde_json::from_slice(&read_file(&dir.join(DESCRIPTION_FILE))?)?;
        let up = read_file(&dir.join(RELATION_FILE))?;
        let positions: PositionData =
            serde_json::from_slice(&read_file(&dir.join(POSITIONS_FILE))?)?;

        let mut texts = FxHashMap::default();
        for (type_name, layers) in &description.layers {
            for layer_name in layers.keys() {
                let path = dir
                    .join(TEXT_DIR)
                    .join(format!("{}.{}.txt", type_name, layer_name));
                let bytes = read_file(&path)?;
                let text = String::from_utf8(bytes).map_err(|e| {
                    CorpusError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                })?;
                texts.insert((type_name.clone(), layer_name.clone()), text);
            }
        }

        debug!(dir = %dir.display(), layers = texts.len(), "corpus bundle read");
        Ok(Self {
            description,
            texts,
            up,
            positions,
        })
    }

    /// Build the corpus indices
    pub fn build(self) -> Result<Corpus, CorpusError> {
        Corpus::build(self.description, self.texts, &self.up, self.positions)
    }
}

/// Read and build a corpus from a bundle directory
pub fn load_corpus(dir: impl AsRef<Path>) -> Result<Corpus, CorpusError> {
    CorpusBundle::from_dir(dir)?.build()
}

/// Read a file, falling back to its gzip compressed variant
fn read_file(path: &Path) -> Result<Vec<u8>, CorpusError> {
    let path = if path.exists() {
        path.to_path_buf()
    } else {
        let mut gz = path.as_os_str().to_owned();
        gz.push(".gz");
        PathBuf::from(gz)
    };

    let mut reader = open_reader(&path)?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Open a file, decompressing when it is gzipped
///
/// Automatically detects gzip-compressed files by extension.
fn open_reader(path: &Path) -> Result<Box<dyn Read>, CorpusError> {
    let file = File::open(path).map_err(|source| CorpusError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
