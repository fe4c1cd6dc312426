// Prompts for the interview flow: turn directives, scoring and follow-up email.

use crate::interview::persona::InterviewContext;

const RESUME_CONTEXT_LIMIT: usize = 4000;

pub fn greeting_directive(first_question: Option<&str>) -> String {
    match first_question {
        Some(q) => format!(
            "Greet the candidate warmly and introduce yourself in one or two sentences. \
             Then ask exactly this first question: \"{q}\""
        ),
        None => "Greet the candidate warmly and introduce yourself in one or two sentences. \
                 Then ask your first question about their interest in and fit for the role."
            .to_string(),
    }
}

pub fn fixed_question_directive(question: &str) -> String {
    format!(
        "Briefly acknowledge the candidate's last answer in one sentence. \
         Then ask exactly this next question: \"{question}\""
    )
}

pub const OPEN_QUESTION_DIRECTIVE: &str = "Briefly acknowledge the candidate's last answer. \
    Then ask the single next question that best evaluates them for this role. \
    Ask one question at a time.";

/// System prompt for one interview turn: persona prompt, resume context, then the directive.
pub fn turn_system_prompt(ctx: &InterviewContext, resume_text: Option<&str>, directive: &str) -> String {
    let mut prompt = ctx.system_prompt();
    if let Some(text) = resume_text.filter(|t| !t.trim().is_empty()) {
        let excerpt: String = text.chars().take(RESUME_CONTEXT_LIMIT).collect();
        prompt.push_str("\n\nThe candidate shared this resume (extracted text):\n");
        prompt.push_str(excerpt.trim());
    }
    prompt.push_str("\n\nInstruction for this reply: ");
    prompt.push_str(directive);
    prompt
}

const SCORING_SCHEMA: &str = "Return your response in JSON format:\n\
{\n  \"fit_score\": 0.0 to 1.0,\n  \"summary_candidate\": \"a short, encouraging summary addressed to the candidate\",\n  \"summary_recruiter\": \"a concise assessment for the recruiter with strengths and concerns\"\n}\n\
fit_score is a fraction between 0.0 and 1.0 even if another scale is mentioned above. \
Convert any other rating to that range before answering.";

/// The persona's scoring prompt with `{ANSWERS}` filled in, or a default one.
/// The JSON schema instruction is always appended so the reply can be parsed.
pub fn scoring_prompt(ctx: &InterviewContext, answers: &str) -> String {
    let body = match ctx.persona.scoring_prompt.as_deref() {
        Some(custom) if custom.contains("{ANSWERS}") => custom.replace("{ANSWERS}", answers),
        Some(custom) => format!("{custom}\n\nCandidate answers:\n{answers}"),
        None => format!(
            "You are evaluating a candidate for the {title} role at {company}.\n\n\
             Role description: {description}\n\n\
             Requirements: {requirements}\n\n\
             Based on the following interview answers, rate the candidate's fit for the role.\n\n\
             {answers}",
            title = ctx.role.title,
            company = ctx.company.name,
            description = ctx.role.description,
            requirements = if ctx.role.requirements.is_empty() {
                "not specified".to_string()
            } else {
                ctx.role.requirements.join("; ")
            },
        ),
    };
    format!("{body}\n\n{SCORING_SCHEMA}")
}

pub struct EmailInputs<'a> {
    pub answers: &'a str,
    pub candidate: &'a str,
    pub score: Option<f64>,
}

pub fn email_prompt(ctx: &InterviewContext, inputs: &EmailInputs<'_>) -> String {
    let score = inputs
        .score
        .map(|s| format!("{:.0}%", s * 100.0))
        .unwrap_or_else(|| "not scored".to_string());

    match ctx.persona.email_prompt.as_deref() {
        Some(custom) => custom
            .replace("{ANSWERS}", inputs.answers)
            .replace("{ROLE}", &ctx.role.title)
            .replace("{COMPANY}", &ctx.company.name)
            .replace("{CANDIDATE}", inputs.candidate)
            .replace("{SCORE}", &score),
        None => format!(
            "Write a short, warm follow-up email from {persona} at {company} to {candidate}, \
             who just completed an interview for the {role} role. \
             Thank them, mention one or two specifics from their answers, \
             and explain that the team will review and reply within a week. \
             Sign off with the HR contact {hr}. Return only the email body.\n\n\
             Fit score: {score}\n\nInterview answers:\n{answers}",
            persona = ctx.persona.name,
            company = ctx.company.name,
            candidate = inputs.candidate,
            role = ctx.role.title,
            hr = ctx
                .company
                .hr_contact_email
                .as_deref()
                .unwrap_or("the hiring team"),
            answers = inputs.answers,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::persona::fixtures;

    #[test]
    fn test_scoring_prompt_substitutes_answers() {
        let mut ctx = fixtures::context(&["Why?"]);
        ctx.persona.scoring_prompt = Some("Rate these:\n{ANSWERS}".into());
        let prompt = scoring_prompt(&ctx, "Q1: Why?\nA1: Because");
        assert!(prompt.starts_with("Rate these:\nQ1: Why?\nA1: Because"));
        assert!(prompt.contains("\"fit_score\""));
    }

    #[test]
    fn test_scoring_prompt_without_placeholder_appends_answers() {
        let mut ctx = fixtures::context(&["Why?"]);
        ctx.persona.scoring_prompt = Some("Score on a 1-5 scale.".into());
        let prompt = scoring_prompt(&ctx, "Q1: Why?\nA1: Because");
        assert!(prompt.contains("Candidate answers:\nQ1: Why?"));
        assert!(prompt.contains("fit_score is a fraction between 0.0 and 1.0 even if another scale"));
    }

    #[test]
    fn test_default_scoring_prompt_names_role() {
        let ctx = fixtures::context(&[]);
        let prompt = scoring_prompt(&ctx, "");
        assert!(prompt.contains("Financial Controller role at SmartJoules"));
        assert!(prompt.contains("CA qualification"));
    }

    #[test]
    fn test_email_prompt_placeholders() {
        let mut ctx = fixtures::context(&["Why?"]);
        ctx.persona.email_prompt = Some("Dear {CANDIDATE}, re {ROLE} at {COMPANY} ({SCORE}).".into());
        let prompt = email_prompt(
            &ctx,
            &EmailInputs {
                answers: "",
                candidate: "Asha",
                score: Some(0.82),
            },
        );
        assert_eq!(prompt, "Dear Asha, re Financial Controller at SmartJoules (82%).");
    }

    #[test]
    fn test_turn_prompt_includes_resume_excerpt() {
        let ctx = fixtures::context(&["Why?"]);
        let prompt = turn_system_prompt(&ctx, Some("CA, 8 years at Deloitte"), OPEN_QUESTION_DIRECTIVE);
        assert!(prompt.contains("CA, 8 years at Deloitte"));
        assert!(prompt.ends_with(OPEN_QUESTION_DIRECTIVE));
    }
}
