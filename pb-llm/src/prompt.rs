use crate::types::Mode;

const PREAMBLE: &str = "You are a prompt optimization expert. Your task is to improve the given prompt to make it more effective, specific, and clear.";
const CLOSING: &str = "Return only the enhanced prompt without any additional explanation.";

/// Instruction prompt for the requested verbosity tier.
pub fn system_prompt(mode: Mode) -> String {
    match mode {
        Mode::Small => format!(
            "{PREAMBLE} Provide a quick, simple enhancement with 1-2 key improvements. Keep it concise and focused. {CLOSING}"
        ),
        Mode::Large => format!(
            "{PREAMBLE} Provide a comprehensive, detailed enhancement with extensive context, examples, output format specifications, and professional-level detail. Make it thorough and complete. {CLOSING}"
        ),
        Mode::Medium => format!(
            "{PREAMBLE} Follow these guidelines:\n\
             1. Make the prompt more specific and detailed\n\
             2. Add context when necessary\n\
             3. Include expected output format\n\
             4. Add examples if helpful\n\
             5. Remove ambiguity\n\
             6. Optimize for AI systems\n\
             \n\
             {CLOSING}"
        ),
    }
}
