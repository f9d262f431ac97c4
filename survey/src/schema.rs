//! Survey data model: questions, responses and parsed cell values.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use glob_match::glob_match;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Kind of question a schema entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    /// Single choice
    #[serde(rename = "SC")]
    SingleChoice,
    /// Multiple choice, answers separated by `;` in the raw data
    #[serde(rename = "MC")]
    MultipleChoice,
    /// Free text entry
    #[serde(rename = "TE")]
    TextEntry,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "SC",
            QuestionType::MultipleChoice => "MC",
            QuestionType::TextEntry => "TE",
        }
    }

    /// Check if answers come from a fixed set of options.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SC" => Ok(QuestionType::SingleChoice),
            "MC" => Ok(QuestionType::MultipleChoice),
            "TE" => Ok(QuestionType::TextEntry),
            other => Err(Error::Spreadsheet(format!("unknown question type: {:?}", other))),
        }
    }
}

/// A single question's schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Column key in the raw data (e.g., "Employment").
    pub key: String,

    /// Question text as shown to respondents.
    pub text: String,

    #[serde(rename = "type")]
    pub qtype: QuestionType,

    /// Options actually used by responses, sorted. Empty for text questions.
    #[serde(default)]
    pub options: BTreeSet<String>,
}

impl SchemaEntry {
    pub fn new(key: impl Into<String>, text: impl Into<String>, qtype: QuestionType) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            qtype,
            options: BTreeSet::new(),
        }
    }

    /// Parse a raw cell for this question, recording any choice options used.
    ///
    /// Empty cells and `NA` are absent.
    pub fn parse_value(&mut self, raw: &str) -> ResponseValue {
        if raw.is_empty() || raw == "NA" {
            return ResponseValue::Absent;
        }
        match self.qtype {
            QuestionType::SingleChoice => {
                self.options.insert(raw.to_string());
                ResponseValue::Text(raw.to_string())
            }
            QuestionType::MultipleChoice => {
                let choices: Vec<String> = raw
                    .split(';')
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                self.options.extend(choices.iter().cloned());
                ResponseValue::Choices(choices)
            }
            QuestionType::TextEntry => ResponseValue::Text(raw.to_string()),
        }
    }

    /// Case-insensitive match against key, text and used options.
    fn matches(&self, needle: &Needle) -> bool {
        needle.is_match(&self.key)
            || needle.is_match(&self.text)
            || self.options.iter().any(|opt| needle.is_match(opt))
    }
}

/// Lowercased search term, either a plain substring or a glob pattern.
enum Needle {
    Substring(String),
    Glob(String),
}

impl Needle {
    fn new(term: &str) -> Self {
        let term = term.to_lowercase();
        if term.contains(['*', '?', '[']) {
            Needle::Glob(term)
        } else {
            Needle::Substring(term)
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        match self {
            Needle::Substring(s) => haystack.contains(s.as_str()),
            Needle::Glob(pattern) => glob_match(pattern, &haystack),
        }
    }
}

/// Ordered list of questions, in the order they appear in the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    entries: Vec<SchemaEntry>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Duplicate keys keep the first definition.
    ///
    /// Returns false if the key was already present.
    pub fn add(&mut self, entry: SchemaEntry) -> bool {
        if self.get(&entry.key).is_some() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn get(&self, key: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    pub fn entry_mut(&mut self, index: usize) -> Option<&mut SchemaEntry> {
        self.entries.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find entries whose key, text or options match `term`.
    ///
    /// Matching is case-insensitive. Terms containing `*`, `?` or `[` are
    /// glob patterns matched against the whole field; anything else is a
    /// substring search.
    pub fn search(&self, term: &str) -> Vec<&SchemaEntry> {
        let needle = Needle::new(term);
        self.entries.iter().filter(|e| e.matches(&needle)).collect()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a SchemaEntry;
    type IntoIter = std::slice::Iter<'a, SchemaEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<SchemaEntry> for Schema {
    fn from_iter<I: IntoIterator<Item = SchemaEntry>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for entry in iter {
            schema.add(entry);
        }
        schema
    }
}

/// A parsed answer to one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    /// No answer (empty cell or `NA`)
    #[default]
    Absent,
    /// Single choice or free text
    Text(String),
    /// Multiple choice answers
    Choices(Vec<String>),
}

impl ResponseValue {
    pub fn is_present(&self) -> bool {
        !matches!(self, ResponseValue::Absent)
    }

    /// The answer as one string; choices are joined with `;`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ResponseValue::Absent => None,
            ResponseValue::Text(s) => Some(s.clone()),
            ResponseValue::Choices(c) => Some(c.join(";")),
        }
    }

    /// The answer as a list of choices; text becomes a single choice.
    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            ResponseValue::Absent => None,
            ResponseValue::Text(s) => Some(std::slice::from_ref(s)),
            ResponseValue::Choices(c) => Some(c),
        }
    }
}

/// One respondent's answers, keyed by question key.
pub type Response = HashMap<String, ResponseValue>;

/// A loaded survey: schema plus responses in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyData {
    pub schema: Schema,
    pub responses: Vec<Response>,
}

impl SurveyData {
    /// Look up a response value, treating unset keys as absent.
    pub fn value<'a>(response: &'a Response, key: &str) -> &'a ResponseValue {
        static ABSENT: ResponseValue = ResponseValue::Absent;
        response.get(key).unwrap_or(&ABSENT)
    }
}
