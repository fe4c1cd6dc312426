//! Question-selection policies for an interview.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::persona::Question;

/// Minimum number of answered exchanges before a model-driven interview may end.
pub const MIN_QUESTIONS: usize = 3;

/// Number of fixed questions a mixed interview asks before handing over to the model.
const MIXED_FIXED_PREFIX: usize = 2;

/// Share of the fixed question list a mixed interview must cover.
const MIXED_COVERAGE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    #[default]
    Structured,
    Conversational,
    Mixed,
}

impl ConversationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationMode::Structured => "structured",
            ConversationMode::Conversational => "conversational",
            ConversationMode::Mixed => "mixed",
        }
    }

    /// First parseable value wins; structured when none parse.
    pub fn resolve(candidates: &[Option<&str>]) -> Self {
        candidates
            .iter()
            .flatten()
            .find_map(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(ConversationMode::Structured),
            // Older persona rows use "free" for the model-driven mode.
            "conversational" | "free" => Ok(ConversationMode::Conversational),
            "mixed" => Ok(ConversationMode::Mixed),
            other => Err(format!("unknown conversation mode '{other}'")),
        }
    }
}

/// Parses a persona's configured mode. Modes that ask fixed questions need at
/// least one question to ask.
pub fn persona_mode(raw: &str, question_count: usize) -> Result<ConversationMode, String> {
    let mode: ConversationMode = raw.parse()?;
    if mode != ConversationMode::Conversational && question_count == 0 {
        return Err(format!("{mode} mode needs at least one question"));
    }
    Ok(mode)
}

/// What the interviewer should ask next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextQuestion {
    /// Ask this fixed question verbatim.
    Fixed(String),
    /// Let the model pick the next best question from context.
    ModelDecides,
    /// Nothing left to ask.
    Done,
}

pub fn next_question(mode: ConversationMode, answered: usize, questions: &[Question]) -> NextQuestion {
    let fixed = |i: usize| NextQuestion::Fixed(questions[i].text.clone());

    match mode {
        ConversationMode::Structured => {
            if answered < questions.len() {
                fixed(answered)
            } else {
                NextQuestion::Done
            }
        }
        ConversationMode::Conversational => NextQuestion::ModelDecides,
        ConversationMode::Mixed => {
            if answered < MIXED_FIXED_PREFIX.min(questions.len()) {
                fixed(answered)
            } else {
                NextQuestion::ModelDecides
            }
        }
    }
}

/// Number of answers after which the interview counts as complete.
pub fn completion_target(mode: ConversationMode, total_questions: usize) -> usize {
    match mode {
        ConversationMode::Structured => total_questions,
        ConversationMode::Conversational => MIN_QUESTIONS,
        ConversationMode::Mixed => {
            let coverage = (total_questions as f64 * MIXED_COVERAGE).ceil() as usize;
            MIN_QUESTIONS.max(coverage)
        }
    }
}

pub fn is_complete(mode: ConversationMode, answered: usize, total_questions: usize) -> bool {
    answered >= completion_target(mode, total_questions)
}

/// Rounded percentage of the completion target reached, capped at 100.
pub fn progress_percentage(mode: ConversationMode, answered: usize, total_questions: usize) -> u8 {
    let target = completion_target(mode, total_questions);
    if target == 0 {
        return if total_questions == 0 && mode == ConversationMode::Structured {
            100
        } else {
            0
        };
    }
    let pct = (answered as f64 / target as f64 * 100.0).round();
    pct.min(100.0) as u8
}
