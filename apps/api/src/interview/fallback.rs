//! Canned replies used once a session has given up on the remote model.

use crate::models::role::RoleRow;

const REQUIREMENTS: &str = "This role requires experience with the following skills:\n\n- Strong communication skills\n- Problem-solving abilities\n- Teamwork and collaboration\n- Technical expertise in the relevant field\n\nDo you have experience with these requirements?";
const SALARY: &str = "The salary for this position is competitive and based on experience. The typical range for this role in this location is between $80,000 and $120,000 per year, plus benefits.";
const APPLICATION: &str = "To apply for this role, you can share your resume and we'll review your qualifications. Would you like to upload your resume now?";
const COMPANY: &str = "This company is known for its innovative approach and great work culture. They offer competitive benefits and opportunities for professional growth.";
const INTERVIEW: &str = "The interview process typically includes an initial screening, a technical assessment, and one or more interviews with the team and leadership.";

/// Keyword groups checked in order; the first group with a hit wins.
const TABLE: &[(&[&str], &str)] = &[
    (&["requirements", "qualifications", "skills"], REQUIREMENTS),
    (&["salary", "pay", "compensation"], SALARY),
    (&["apply", "application", "submit"], APPLICATION),
    (&["company", "culture", "benefits"], COMPANY),
    (&["interview", "process", "hiring"], INTERVIEW),
];

pub const DEGRADED_NOTICE: &str = "We're using a local assistant due to connection issues. Your experience might be limited.";

/// Keyword-matched reply for `message`, or a generic one built from the role's tags.
pub fn local_reply(message: &str, role: &RoleRow) -> String {
    let lower = message.to_lowercase();
    if let Some((_, reply)) = TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
    {
        return reply.to_string();
    }

    let topic: String = message.chars().take(30).collect();
    let tags = if role.tags.is_empty() {
        "various technologies and tools".to_string()
    } else {
        role.tags.join(", ")
    };
    format!(
        "Thanks for your question about {topic}... As a {}, you would be working with {tags}. Is there something specific about this role you'd like to know?",
        role.title
    )
}

/// Opening line used when the greeting could not be fetched from the model.
pub fn local_greeting(persona_name: &str, role: &RoleRow) -> String {
    format!(
        "Hello! I'm {persona_name}, your assistant for the {} role. Ask me anything about the position!",
        role.title
    )
}
