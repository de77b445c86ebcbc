use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A question as it appears in a question-set file.
///
/// Two shapes occur in the data: pre-ordered options with the correct answer given
/// by position, and a correct answer plus a list of incorrect answers that the engine
/// assembles into an option list itself. Anything else is kept verbatim so that a single
/// bad record can be skipped instead of failing the whole file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QuestionRecord {
    Indexed {
        question: String,
        options: Vec<String>,
        answer: i64,
    },
    Open {
        question: String,
        correct_answer: String,
        incorrect_answers: Vec<String>,
    },
    Unrecognized(JsonValue),
}

/// How correctness is decided for a question.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerKey {
    /// Correct when the chosen option sits at this position.
    Position(usize),
    /// Correct when the chosen option's text equals this value.
    Text(String),
}

/// A validated question from the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionItem {
    pub prompt: String,
    /// For `AnswerKey::Text` questions the order here is not meaningful; options are
    /// shuffled each time the question is presented.
    pub options: Vec<String>,
    pub key: AnswerKey,
}

impl QuestionItem {
    /// Validates a wire record, returning the reason it was rejected on failure.
    pub fn from_record(record: &QuestionRecord) -> Result<Self, String> {
        match record {
            QuestionRecord::Indexed {
                question,
                options,
                answer,
            } => {
                check_prompt(question)?;
                check_option_count(options.len())?;
                let correct = usize::try_from(*answer)
                    .ok()
                    .filter(|index| *index < options.len())
                    .ok_or_else(|| {
                        format!(
                            "answer index {} is outside the {} options",
                            answer,
                            options.len()
                        )
                    })?;
                Ok(Self {
                    prompt: question.clone(),
                    options: options.clone(),
                    key: AnswerKey::Position(correct),
                })
            }
            QuestionRecord::Open {
                question,
                correct_answer,
                incorrect_answers,
            } => {
                check_prompt(question)?;
                check_option_count(incorrect_answers.len() + 1)?;
                let mut options = Vec::with_capacity(incorrect_answers.len() + 1);
                options.push(correct_answer.clone());
                options.extend(incorrect_answers.iter().cloned());
                Ok(Self {
                    prompt: question.clone(),
                    options,
                    key: AnswerKey::Text(correct_answer.clone()),
                })
            }
            QuestionRecord::Unrecognized(_) => {
                Err("record matches neither known question shape".to_string())
            }
        }
    }

    pub fn needs_option_shuffle(&self) -> bool {
        matches!(self.key, AnswerKey::Text(_))
    }
}

fn check_prompt(prompt: &str) -> Result<(), String> {
    if prompt.trim().is_empty() {
        return Err("question text is empty".to_string());
    }
    Ok(())
}

fn check_option_count(count: usize) -> Result<(), String> {
    if count < 2 {
        return Err(format!("needs at least 2 options, found {}", count));
    }
    Ok(())
}

/// A player's pick: either the position of an option or its text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Choice {
    Index(usize),
    Value(String),
}

/// A question as shown during one play-through, with its options in display order.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PresentedQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Position of the option highlighted as correct. With duplicate option text the
    /// first occurrence wins.
    #[serde(skip)]
    pub correct_index: usize,
    #[serde(skip)]
    key: AnswerKey,
}

impl PresentedQuestion {
    /// Builds the displayed form of `item` using the given option order.
    ///
    /// Returns `None` if `options` does not contain the correct answer, which cannot
    /// happen for a permutation of a validated item's options.
    pub fn new(item: &QuestionItem, options: Vec<String>) -> Option<Self> {
        let correct_index = match &item.key {
            AnswerKey::Position(index) => {
                if *index >= options.len() {
                    return None;
                }
                *index
            }
            AnswerKey::Text(text) => options.iter().position(|option| option == text)?,
        };
        Some(Self {
            prompt: item.prompt.clone(),
            options,
            correct_index,
            key: item.key.clone(),
        })
    }

    /// Resolves a choice to an option position. Value choices match the first option
    /// with equal text.
    pub fn resolve_choice(&self, choice: &Choice) -> Option<usize> {
        match choice {
            Choice::Index(index) if *index < self.options.len() => Some(*index),
            Choice::Index(_) => None,
            Choice::Value(value) => self.options.iter().position(|option| option == value),
        }
    }

    pub fn is_correct(&self, chosen_index: usize) -> bool {
        match &self.key {
            AnswerKey::Position(index) => chosen_index == *index,
            AnswerKey::Text(text) => self
                .options
                .get(chosen_index)
                .is_some_and(|option| option == text),
        }
    }
}
