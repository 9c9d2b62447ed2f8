// Cross-cutting prompt fragments.
// Each service that needs model calls defines its own prompts.rs alongside it.

/// Instruction appended to every extraction prompt to suppress prose.
pub const JSON_ONLY_INSTRUCTION: &str =
    "IMPORTANT: Return ONLY the JSON object, no other text.";
