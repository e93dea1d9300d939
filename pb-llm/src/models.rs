//! Known model names per vendor, used to check `config set --model`.

use crate::client::Vendor;

const OPENAI_MODELS: &[&str] = &[
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4o-audio-preview",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
    "chatgpt-4o-latest",
    "o1",
    "o1-mini",
    "o1-preview",
    "o3-mini",
    "o3",
    "o4-mini",
    "gpt-3.5-turbo-instruct",
];

const ANTHROPIC_MODELS: &[&str] = &[
    "claude-4-opus-20250514",
    "claude-4-sonnet-20250514",
    "claude-3-7-sonnet-20250219",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-sonnet-20240620",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

const GOOGLE_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-pro-preview-05-06",
    "gemini-2.5-flash-preview-04-17",
    "gemini-2.5-pro-exp-03-25",
    "gemini-2.0-flash",
    "gemini-2.0-flash-exp",
    "gemini-1.5-pro",
    "gemini-1.5-pro-latest",
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-flash-8b",
    "gemini-1.5-flash-8b-latest",
];

const GROK_MODELS: &[&str] = &[
    "grok-3",
    "grok-3-fast",
    "grok-3-mini",
    "grok-3-mini-fast",
    "grok-2-1212",
    "grok-2-vision-1212",
    "grok-beta",
    "grok-vision-beta",
];

/// Deprecated or shorthand names and their replacements.
const RENAMED: &[(Vendor, &str, &str)] = &[
    (Vendor::OpenAi, "gpt-3.5-turbo-16k", "gpt-3.5-turbo"),
    (Vendor::OpenAi, "gpt-4-32k", "gpt-4-turbo"),
    (Vendor::OpenAi, "gpt-4-0613", "gpt-4"),
    (Vendor::OpenAi, "gpt-4-turbo-preview", "gpt-4-turbo"),
    (Vendor::Anthropic, "claude-3-sonnet", "claude-3-5-sonnet-20241022"),
    (Vendor::Anthropic, "claude-3-haiku", "claude-3-5-haiku-20241022"),
    (Vendor::Anthropic, "claude-3-opus", "claude-3-opus-20240229"),
    (Vendor::Google, "gemini-pro", "gemini-1.5-pro"),
    (Vendor::Google, "gemini-pro-vision", "gemini-1.5-pro"),
    (Vendor::Google, "gemini-1.0-pro", "gemini-1.5-pro"),
    (Vendor::Grok, "grok-1", "grok-beta"),
    (Vendor::Grok, "grok-2", "grok-2-1212"),
];

pub fn valid_models(vendor: Vendor) -> &'static [&'static str] {
    match vendor {
        Vendor::OpenAi => OPENAI_MODELS,
        Vendor::Anthropic => ANTHROPIC_MODELS,
        Vendor::Google => GOOGLE_MODELS,
        Vendor::Grok => GROK_MODELS,
    }
}

pub fn is_valid_model(vendor: Vendor, model: &str) -> bool {
    valid_models(vendor).contains(&model)
}

pub fn default_model(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::OpenAi => "gpt-4o-mini",
        Vendor::Anthropic => "claude-3-5-sonnet-20241022",
        Vendor::Google => "gemini-1.5-flash",
        Vendor::Grok => "grok-beta",
    }
}

/// Replacement for a deprecated or unknown name; `None` when `model` is fine.
pub fn recommended_model(vendor: Vendor, model: &str) -> Option<&'static str> {
    if let Some((_, _, to)) = RENAMED.iter().find(|(v, from, _)| *v == vendor && *from == model) {
        return Some(*to);
    }
    if is_valid_model(vendor, model) {
        None
    } else {
        Some(default_model(vendor))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ModelValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_model(provider_name: &str, model: &str) -> ModelValidation {
    let mut out = ModelValidation::default();
    let Some(vendor) = Vendor::from_name(provider_name) else {
        let supported: Vec<&str> = Vendor::ALL.iter().map(|v| v.name()).collect();
        out.errors.push(format!(
            "Provider '{provider_name}' is not supported. Supported providers: {}",
            supported.join(", ")
        ));
        return out;
    };

    if !is_valid_model(vendor, model) {
        out.errors
            .push(format!("Model '{model}' is not valid for provider '{}'.", vendor.name()));
        out.errors.push(format!(
            "Valid models for {}: {}",
            vendor.name(),
            valid_models(vendor).join(", ")
        ));
        return out;
    }

    if vendor == Vendor::OpenAi && ["o1", "o3", "o4"].iter().any(|p| model.starts_with(*p)) {
        out.warnings.push(format!(
            "Note: {model} is a reasoning model with longer response times."
        ));
    }
    out
}
