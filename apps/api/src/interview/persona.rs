//! Persona profiles and the system prompt built from role, company and persona.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::queries::RoleWithCompany;
use crate::interview::mode::ConversationMode;
use crate::models::company::CompanyRow;
use crate::models::persona::{PersonaRow, Question};
use crate::models::role::RoleRow;

pub const DEFAULT_PERSONA_NAME: &str = "AI Recruiter";
const DEFAULT_TONE: &str = "professional and friendly";
const DEFAULT_VALUES: &str = "innovation, teamwork, excellence";
const DEFAULT_HR_EMAIL: &str = "hr@company.com";
const DEFAULT_END_MESSAGE: &str = "Thank you! We'll be in touch.";
pub const GENERIC_FALLBACK_MESSAGE: &str = "I apologize, but I'm having trouble connecting to my knowledge base right now. Please try again later.";

/// Interviewer configuration used by a session. Built from a persona row, or
/// substituted with a default when the role has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub persona_id: Option<Uuid>,
    pub name: String,
    pub tone: Option<String>,
    pub mode: ConversationMode,
    pub system_prompt: Option<String>,
    pub questions: Vec<Question>,
    pub scoring_prompt: Option<String>,
    pub email_prompt: Option<String>,
    pub fallback_message: Option<String>,
    pub end_message: Option<String>,
    pub avatar_url: Option<String>,
    pub is_default: bool,
}

impl PersonaProfile {
    pub fn from_row(row: PersonaRow, role: &RoleRow) -> Self {
        let questions = row
            .question_sequence
            .map(|seq| seq.0.questions)
            .unwrap_or_default();
        let mode = effective_mode(
            ConversationMode::resolve(&[
                row.conversation_mode.as_deref(),
                role.conversation_mode.as_deref(),
            ]),
            &questions,
        );
        Self {
            persona_id: Some(row.id),
            name: row.persona_name,
            tone: row.tone,
            mode,
            system_prompt: row.system_prompt.filter(|p| !p.trim().is_empty()),
            questions,
            scoring_prompt: row.scoring_prompt,
            email_prompt: row.email_prompt,
            fallback_message: row.fallback_message,
            end_message: row.end_message,
            avatar_url: row.avatar_url,
            is_default: false,
        }
    }

    /// Stand-in for roles without a persona: a conversational recruiter with no fixed questions.
    pub fn default_for(role: &RoleRow, company: &CompanyRow) -> Self {
        Self {
            persona_id: None,
            name: DEFAULT_PERSONA_NAME.to_string(),
            tone: Some("professional and helpful".to_string()),
            mode: ConversationMode::Conversational,
            system_prompt: None,
            questions: Vec::new(),
            scoring_prompt: None,
            email_prompt: None,
            fallback_message: Some(format!(
                "I'm here to help you learn more about the {} role at {} and assist with your application process.",
                role.title, company.name
            )),
            end_message: None,
            avatar_url: None,
            is_default: true,
        }
    }

    pub fn resolve(row: Option<PersonaRow>, role: &RoleRow, company: &CompanyRow) -> Self {
        match row {
            Some(row) => Self::from_row(row, role),
            None => {
                tracing::warn!("No persona found for role {}, using default", role.id);
                Self::default_for(role, company)
            }
        }
    }

    pub fn fallback_message(&self) -> &str {
        self.fallback_message
            .as_deref()
            .unwrap_or(GENERIC_FALLBACK_MESSAGE)
    }

    pub fn end_message(&self) -> &str {
        self.end_message.as_deref().unwrap_or(DEFAULT_END_MESSAGE)
    }
}

/// A structured interview with nothing to ask is run as a conversational one.
fn effective_mode(mode: ConversationMode, questions: &[Question]) -> ConversationMode {
    if mode == ConversationMode::Structured && questions.is_empty() {
        ConversationMode::Conversational
    } else {
        mode
    }
}

/// Snapshot of everything the interviewer needs to know about the opening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewContext {
    pub role: RoleRow,
    pub company: CompanyRow,
    pub persona: PersonaProfile,
}

impl InterviewContext {
    pub fn new(loaded: RoleWithCompany, persona: Option<PersonaRow>) -> Self {
        let persona = PersonaProfile::resolve(persona, &loaded.role, &loaded.company);
        Self {
            role: loaded.role,
            company: loaded.company,
            persona,
        }
    }

    /// The persona's own system prompt when it has one, otherwise one assembled
    /// from role, company and persona fields.
    pub fn system_prompt(&self) -> String {
        if let Some(prompt) = &self.persona.system_prompt {
            return prompt.clone();
        }

        let persona = &self.persona;
        let company = &self.company;
        let role = &self.role;

        let tone = persona
            .tone
            .as_deref()
            .or(company.tone.as_deref())
            .unwrap_or(DEFAULT_TONE);
        let values = if company.cultural_keywords.is_empty() {
            if company.values.is_empty() {
                DEFAULT_VALUES.to_string()
            } else {
                company.values.join(", ")
            }
        } else {
            company.cultural_keywords.join(", ")
        };
        let sequence_line = if persona.mode == ConversationMode::Structured && !persona.questions.is_empty() {
            "You will ask a specific sequence of questions to evaluate the candidate."
        } else {
            "Ask questions to best evaluate the candidate for this role."
        };
        let assets = if role.must_have_assets.is_empty() {
            "resume".to_string()
        } else {
            role.must_have_assets.join(", ")
        };
        let fallback = persona.fallback_message.clone().unwrap_or_else(|| {
            format!(
                "Please reach our HR at {}",
                company.hr_contact_email.as_deref().unwrap_or(DEFAULT_HR_EMAIL)
            )
        });

        format!(
            "You are {name}, representing the {title} role at {company}.\n\n\
             Speak in a tone that is {tone}.\n\
             Conversation mode: {mode}.\n\
             Company values: {values}\n\n\
             {sequence_line}\n\n\
             Prompt the user for {assets} if required.\n\n\
             Fallback message: \"{fallback}\"\n\
             End message: \"{end}\"",
            name = persona.name,
            title = role.title,
            company = company.name,
            mode = persona.mode,
            end = persona.end_message(),
        )
    }
}
