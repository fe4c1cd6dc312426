// Shared prompt fragments.
// Each module that needs LLM calls defines its own prompts alongside it;
// this file holds what several of them use.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Renders question/answer pairs as `Q1: ...\nA1: ...` blocks separated by blank lines.
pub fn format_answers<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .enumerate()
        .map(|(i, (q, a))| format!("Q{n}: {q}\nA{n}: {a}", n = i + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}
