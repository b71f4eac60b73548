// Shared prompt fragments.
// Each plan kind defines its own template in planning/prompts.rs.
// This file contains cross-cutting fragments appended to every plan prompt.

/// Persona line that opens every plan prompt.
pub const PERSONA: &str = "You are SmartStart AI, a world-class virtual business consultant \
    trained in global markets, startup strategy, and localized economic trends.";

/// Instruction that closes every plan prompt.
pub const JSON_ONLY_INSTRUCTION: &str = "Respond ONLY with a clean, valid JSON object \
    matching the structure above. Do not include explanations or extra text.";

/// Placeholder interpolated for optional form fields the user left blank.
pub const NOT_SPECIFIED: &str = "Not specified";
