use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use serde::Deserialize;

use crate::error::{ParlanceError, Result};

static VOCAB_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/vocab");

/// Ordered keyword list the scheduler walks through
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Vocabulary {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SupportedVocabulary {
    #[default]
    Basic,
    Travel,
    Daily,
}

impl SupportedVocabulary {
    pub fn load(&self) -> Result<Vocabulary> {
        read_vocabulary(&format!("{self}.json"))
    }
}

fn read_vocabulary(file_name: &str) -> Result<Vocabulary> {
    let contents = VOCAB_DIR
        .get_file(file_name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| ParlanceError::Service(format!("vocabulary {file_name} is not bundled")))?;

    Ok(serde_json::from_str(contents)?)
}
