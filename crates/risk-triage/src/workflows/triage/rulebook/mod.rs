mod diagnostics;
mod entity;
mod loader;

pub use diagnostics::RulebookDiagnostic;
pub use entity::{entity_type_block, ENTITY_TYPES, ENTITY_TYPE_ID};
pub use loader::RulebookError;

use super::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// How a question collects its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    SingleSelect,
    MultiSelect,
    Text,
}

impl QuestionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SingleSelect => "singleSelect",
            Self::MultiSelect => "multiSelect",
            Self::Text => "text",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "singleSelect" => Some(Self::SingleSelect),
            "multiSelect" => Some(Self::MultiSelect),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionPriority {
    High,
    Medium,
}

impl ActionPriority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            _ => None,
        }
    }
}

/// Selectable answer for single and multi select questions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuestionOption {
    pub text: String,
    pub points: i64,
    pub next_step: Option<String>,
    pub risk_comment: Option<String>,
    pub legal_basis: Option<String>,
    pub action_priority: Option<ActionPriority>,
    pub tag: Option<String>,
    pub hardcore: Option<bool>,
}

impl QuestionOption {
    pub fn new(text: impl Into<String>, points: i64) -> Self {
        Self {
            text: text.into(),
            points,
            ..Self::default()
        }
    }
}

/// Entity types a question is asked of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliesTo {
    All,
    Entities(Vec<String>),
}

impl AppliesTo {
    pub fn includes(&self, entity_type: Option<&str>) -> bool {
        match self {
            AppliesTo::All => true,
            AppliesTo::Entities(entities) => entity_type
                .map(|entity| entities.iter().any(|candidate| candidate == entity))
                .unwrap_or(false),
        }
    }
}

/// Conditional jump evaluated after the owning question is answered.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub when: Option<Predicate>,
    pub target_id: String,
}

/// One normalized question definition.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBlock {
    pub id: String,
    pub domain: String,
    pub question: String,
    pub kind: QuestionKind,
    pub options: Vec<QuestionOption>,
    pub applies_to: AppliesTo,
    pub show_if: Option<Predicate>,
    pub next: Vec<Route>,
}

impl QuestionBlock {
    pub fn option(&self, text: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|option| option.text == text)
    }

    /// Single select questions without options fall back to a free text prompt.
    pub fn is_free_text(&self) -> bool {
        match self.kind {
            QuestionKind::Text => true,
            QuestionKind::SingleSelect => self.options.is_empty(),
            QuestionKind::MultiSelect => false,
        }
    }
}

/// Normalized, immutable question set plus the warnings raised while loading it.
#[derive(Debug, Clone)]
pub struct Rulebook {
    blocks: Vec<QuestionBlock>,
    index: HashMap<String, usize>,
    diagnostics: Vec<RulebookDiagnostic>,
}

impl Rulebook {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RulebookError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RulebookError> {
        let raw: serde_json::Value = serde_yaml::from_reader(reader)?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: serde_json::Value) -> Result<Self, RulebookError> {
        let (blocks, diagnostics) = loader::normalize(raw)?;
        let index = blocks
            .iter()
            .enumerate()
            .map(|(position, block)| (block.id.clone(), position))
            .collect();

        Ok(Self {
            blocks,
            index,
            diagnostics,
        })
    }

    /// Blocks in declaration order.
    pub fn blocks(&self) -> &[QuestionBlock] {
        &self.blocks
    }

    pub fn block(&self, id: &str) -> Option<&QuestionBlock> {
        self.index.get(id).map(|position| &self.blocks[*position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn diagnostics(&self) -> &[RulebookDiagnostic] {
        &self.diagnostics
    }
}

/// Parses YAML or JSON rulebook text.
impl FromStr for Rulebook {
    type Err = RulebookError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let raw: serde_json::Value = serde_yaml::from_str(source)?;
        Self::from_value(raw)
    }
}
