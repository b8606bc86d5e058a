use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Answer letters in option order.
pub const ANSWER_LETTERS: [&str; 5] = ["A", "B", "C", "D", "E"];

const FEW_SHOT_PREFIX: &str = "full_question_";

/// Position of an answer in the option list, addressed by letter.
///
/// The table is fixed: A→0, B→1, C→2, D→3, E→4. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnswerKey(usize);

impl AnswerKey {
    pub fn parse(key: &str) -> Result<Self> {
        ANSWER_LETTERS
            .iter()
            .position(|letter| *letter == key)
            .map(Self)
            .ok_or_else(|| EvalError::DataFormat(format!("unknown answer key {key:?}")))
    }

    pub fn from_index(index: usize) -> Result<Self> {
        if index < ANSWER_LETTERS.len() {
            return Ok(Self(index));
        }
        Err(EvalError::DataFormat(format!(
            "option index {index} has no answer letter (max {})",
            ANSWER_LETTERS.len()
        )))
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn letter(self) -> &'static str {
        ANSWER_LETTERS[self.0]
    }
}

impl FromStr for AnswerKey {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// One multiple-choice question as stored in the benchmark file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(rename = "prompt")]
    pub prompt_text: String,
    pub subject: String,
    pub options: Vec<String>,
    #[serde(rename = "key")]
    pub correct_key: String,
    /// Remaining columns; pre-formatted few-shot prompts live here.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BenchmarkRecord {
    pub fn new(
        prompt_text: impl Into<String>,
        subject: impl Into<String>,
        options: Vec<String>,
        correct_key: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            prompt_text: prompt_text.into(),
            subject: subject.into(),
            options,
            correct_key: correct_key.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_few_shot(mut self, shot: u8, llama: bool, text: impl Into<String>) -> Self {
        self.extra
            .insert(few_shot_field(shot, llama), serde_json::Value::String(text.into()));
        self
    }

    /// Index of the gold option. Fails if the key is not a known letter or
    /// points past the end of `options`.
    pub fn gold_index(&self) -> Result<usize> {
        let key = AnswerKey::parse(&self.correct_key)?;
        if key.index() >= self.options.len() {
            return Err(EvalError::DataFormat(format!(
                "answer key {key} out of range for {} options",
                self.options.len()
            )));
        }
        Ok(key.index())
    }

    /// Pre-formatted few-shot question, e.g. `full_question_2shot_llama`.
    pub fn few_shot_prompt(&self, shot: u8, llama: bool) -> Result<&str> {
        let field = few_shot_field(shot, llama);
        match self.extra.get(&field) {
            Some(serde_json::Value::String(text)) => Ok(text.as_str()),
            Some(other) => Err(EvalError::DataFormat(format!(
                "field {field} is not a string: {other}"
            ))),
            None => Err(EvalError::DataFormat(format!("missing field {field}"))),
        }
    }
}

fn few_shot_field(shot: u8, llama: bool) -> String {
    match llama {
        true => format!("{FEW_SHOT_PREFIX}{shot}shot_llama"),
        false => format!("{FEW_SHOT_PREFIX}{shot}shot"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(options: &[&str], key: &str) -> BenchmarkRecord {
        BenchmarkRecord::new(
            "Apakah ibu negara Perancis?",
            "Geografi",
            options.iter().map(|s| s.to_string()).collect(),
            key,
        )
    }

    #[test]
    fn test_letter_table_is_fixed() {
        for (i, letter) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            let key = AnswerKey::parse(letter).unwrap();
            assert_eq!(key.index(), i);
            assert_eq!(key.letter(), *letter);
        }
    }

    #[test]
    fn test_unknown_keys_rejected() {
        for bad in ["a", "F", "", "AB", " A", "0"] {
            let err = AnswerKey::parse(bad).unwrap_err();
            assert!(matches!(err, EvalError::DataFormat(_)), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_from_index_bounds() {
        assert_eq!(AnswerKey::from_index(4).unwrap().letter(), "E");
        assert!(AnswerKey::from_index(5).is_err());
    }

    #[test]
    fn test_gold_index() {
        assert_eq!(record(&["Paris", "Lyon", "Nice"], "A").gold_index().unwrap(), 0);
        assert_eq!(record(&["Paris", "Lyon", "Nice"], "C").gold_index().unwrap(), 2);
    }

    #[test]
    fn test_gold_index_out_of_range() {
        let err = record(&["Paris", "Lyon", "Nice"], "D").gold_index().unwrap_err();
        assert!(matches!(err, EvalError::DataFormat(_)));
    }

    #[test]
    fn test_deserialize_with_few_shot_columns() {
        let json = r#"{
            "id": 7,
            "prompt": "Soalan?\nA. Satu\nB. Dua",
            "subject": "Matematik",
            "options": ["A. Satu", "B. Dua"],
            "key": "B",
            "category": "STEM",
            "full_question_1shot": "contoh\n\nSoalan?",
            "full_question_1shot_llama": "contoh llama\n\nSoalan?"
        }"#;

        let record: BenchmarkRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.prompt_text, "Soalan?\nA. Satu\nB. Dua");
        assert_eq!(record.gold_index().unwrap(), 1);
        assert_eq!(record.few_shot_prompt(1, false).unwrap(), "contoh\n\nSoalan?");
        assert_eq!(record.few_shot_prompt(1, true).unwrap(), "contoh llama\n\nSoalan?");
        assert!(record.few_shot_prompt(2, false).is_err());
    }
}
