use pb_llm::TestResult;
use std::io::IsTerminal;

/// Status glyphs. ASCII fallbacks are used in CI and when stdout is piped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbols {
    pub bullet: &'static str,
    pub check: &'static str,
    pub cross: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub test: &'static str,
    pub config: &'static str,
    pub tip: &'static str,
}

const UNICODE: Symbols = Symbols {
    bullet: "•",
    check: "✓",
    cross: "✗",
    warning: "⚠",
    error: "❌",
    test: "🧪",
    config: "📄",
    tip: "💡",
};

const ASCII: Symbols = Symbols {
    bullet: "-",
    check: "OK",
    cross: "X",
    warning: "!",
    error: "ERR",
    test: "TEST",
    config: "CFG",
    tip: "TIP",
};

impl Symbols {
    pub fn detect() -> Self {
        Self::select(std::env::var_os("CI").is_some(), std::io::stdout().is_terminal())
    }

    fn select(ci: bool, tty: bool) -> Self {
        if ci || !tty { ASCII } else { UNICODE }
    }
}

/// One result line: `  <name padded to 12> <status> <timing> (<model>)`.
pub fn result_row(sym: &Symbols, result: &TestResult) -> String {
    let status = if result.success {
        format!("{} Working", sym.check)
    } else {
        format!("{} Failed", sym.cross)
    };
    let mut row = format!(
        "  {:<12} {status} {}ms",
        result.provider_name, result.response_time_ms
    );
    if let Some(model) = &result.model {
        row.push_str(&format!(" ({model})"));
    }
    row
}

pub fn summary(results: &[TestResult]) -> String {
    let ok = results.iter().filter(|r| r.success).count();
    format!("{ok}/{} providers working", results.len())
}

pub fn configure_hint(provider: &str) -> String {
    format!("promptboost config set --provider {provider} --key your-api-key")
}
