//! Pre-flight checks on the prompt text and file arguments.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const MIN_PROMPT_CHARS: usize = 8;
const MAX_PROMPT_CHARS: usize = 50_000;
const MAX_SPECIAL_RATIO: f64 = 0.3;
const MIN_MEANINGFUL_CHARS: usize = 5;

const PROMPT_EXTENSIONS: &[&str] = &[".txt", ".md", ".text", ".prompt"];
const SYSTEM_DIRS: &[&str] = &["/etc/", "/sys/", "/proc/", "c:\\windows\\", "c:\\system32\\"];

static HARMFUL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:^|\s)(hack|exploit|bypass|crack|jailbreak)(?:\s|$)",
        r"(?i)(?:^|\s)(illegal|terrorism|violence|harm)(?:\s|$)",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});
static BINARY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[01\s]+$").ok());
static BASE64: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/=\s]+$").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub field: &'static str,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Issue {
    fn new(field: &'static str, message: &str, suggestion: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
            suggestion: Some(suggestion.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
}

pub fn validate_prompt(prompt: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    let len = prompt.chars().count();
    let trimmed = prompt.trim();

    if len < MIN_PROMPT_CHARS {
        issues.push(Issue::new(
            "length",
            "Prompt must be at least 8 characters long",
            "Add more detail to describe what you want the AI to help with",
        ));
    }
    if len > MAX_PROMPT_CHARS {
        issues.push(Issue::new(
            "length",
            "Prompt is too long (maximum 50,000 characters)",
            "Consider breaking your request into smaller parts or using a file input",
        ));
    }
    if trimmed.is_empty() {
        issues.push(Issue::new(
            "content",
            "Prompt cannot be empty or contain only whitespace",
            "Provide a meaningful prompt describing your request",
        ));
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() == 1 && words[0].chars().count() < 3 {
        issues.push(Issue::new(
            "content",
            "Single very short words are not meaningful prompts",
            "Describe what you want in more detail",
        ));
    }
    if words.len() > 1 {
        let unique: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
        if unique.len() == 1 {
            issues.push(Issue::new(
                "content",
                "Prompt appears to be repetitive (same word repeated)",
                "Provide a varied description of what you need",
            ));
        }
    }

    if HARMFUL.iter().any(|re| re.is_match(prompt)) {
        issues.push(Issue::new(
            "content",
            "Prompt may contain inappropriate content",
            "Please rephrase your request in a constructive way",
        ));
    }

    if len > 0 {
        let special = prompt.chars().filter(|c| is_special(*c)).count();
        if special as f64 / len as f64 > MAX_SPECIAL_RATIO {
            issues.push(Issue::new(
                "content",
                "Prompt contains too many special characters",
                "Use plain text with standard punctuation for better AI understanding",
            ));
        }
    }

    if len > 20 && BINARY.as_ref().is_some_and(|re| re.is_match(trimmed)) {
        issues.push(Issue::new(
            "content",
            "Prompt appears to be binary data",
            "Please provide a text-based prompt describing your request",
        ));
    }
    if len > 50 && prompt.contains('=') && BASE64.as_ref().is_some_and(|re| re.is_match(trimmed)) {
        issues.push(Issue::new(
            "content",
            "Prompt appears to be encoded data",
            "Please provide a clear text description of what you need",
        ));
    }

    if prompt.chars().filter(char::is_ascii_alphanumeric).count() < MIN_MEANINGFUL_CHARS {
        issues.push(Issue::new(
            "content",
            "Prompt lacks meaningful content",
            "Include letters and numbers to describe your request clearly",
        ));
    }

    issues
}

fn is_special(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || c.is_whitespace() || ".,!?'\"()-".contains(c))
}

pub fn validate_file_path(path: &str, op: FileOp) -> Vec<Issue> {
    if path.trim().is_empty() {
        return vec![Issue {
            field: "path",
            message: "File path cannot be empty".to_string(),
            suggestion: None,
        }];
    }

    let mut issues = Vec::new();
    let lower = path.to_lowercase();
    if SYSTEM_DIRS.iter().any(|d| lower.contains(d)) {
        issues.push(Issue::new(
            "path",
            "File path points to a system directory",
            "Use a safe location like your home directory or project folder",
        ));
    }
    if op == FileOp::Read && !PROMPT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        issues.push(Issue {
            field: "path",
            message: "File should have a text-based extension".to_string(),
            suggestion: Some(format!("Use one of: {}", PROMPT_EXTENSIONS.join(", "))),
        });
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn ordinary_prompt_passes() {
        assert!(validate_prompt("Write a short story about a lighthouse keeper.").is_empty());
    }

    #[test]
    fn short_and_single_word_prompts_fail() {
        let issues = validate_prompt("hi");
        let msgs = messages(&issues);
        assert!(msgs.contains(&"Prompt must be at least 8 characters long"));
        assert!(msgs.contains(&"Single very short words are not meaningful prompts"));
        assert!(msgs.contains(&"Prompt lacks meaningful content"));
    }

    #[test]
    fn whitespace_only_prompt_fails() {
        let issues = validate_prompt("          ");
        assert!(messages(&issues).contains(&"Prompt cannot be empty or contain only whitespace"));
    }

    #[test]
    fn repeated_words_are_flagged() {
        let issues = validate_prompt("test Test TEST test");
        assert_eq!(
            messages(&issues),
            vec!["Prompt appears to be repetitive (same word repeated)"]
        );
    }

    #[test]
    fn harmful_keywords_warn_once() {
        let issues = validate_prompt("how to hack a server and cause violence here");
        let harmful = issues
            .iter()
            .filter(|i| i.message == "Prompt may contain inappropriate content")
            .count();
        assert_eq!(harmful, 1);
        assert!(validate_prompt("explain how hackathons are organized").is_empty());
    }

    #[test]
    fn symbol_heavy_prompt_is_flagged() {
        let issues = validate_prompt("@@@@ ### $$$ %%% make this work");
        assert!(messages(&issues).contains(&"Prompt contains too many special characters"));
    }

    #[test]
    fn binary_and_encoded_payloads_are_flagged() {
        let issues = validate_prompt("0101 1100 0011 1010 0110 1001");
        assert!(messages(&issues).contains(&"Prompt appears to be binary data"));

        let encoded = "U29tZSBiYXNlNjQgZW5jb2RlZCB0ZXh0IHRoYXQgaXMgbG9uZyBlbm91Z2g=";
        let issues = validate_prompt(encoded);
        assert!(messages(&issues).contains(&"Prompt appears to be encoded data"));
    }

    #[test]
    fn overlong_prompt_is_flagged() {
        let prompt = "word ".repeat(10_001);
        let issues = validate_prompt(&prompt);
        assert!(messages(&issues).contains(&"Prompt is too long (maximum 50,000 characters)"));
    }

    #[test]
    fn file_paths_are_checked() {
        assert!(validate_file_path("notes/prompt.md", FileOp::Read).is_empty());
        assert_eq!(validate_file_path("data.json", FileOp::Read).len(), 1);
        assert!(validate_file_path("out.json", FileOp::Write).is_empty());
        let issues = validate_file_path("/etc/passwd", FileOp::Write);
        assert_eq!(issues[0].message, "File path points to a system directory");
        assert_eq!(validate_file_path("  ", FileOp::Read)[0].message, "File path cannot be empty");
    }
}
