use crate::EnhanceArgs;
use crate::config::PromptBoostConfig;
use crate::output::{Symbols, configure_hint};
use crate::validation::{FileOp, Issue, validate_file_path, validate_prompt};
use pb_llm::{EnhanceOptions, EnhanceRequest, EnhanceResponse, OutputFormat, create_provider};
use std::io::Write;
use std::path::PathBuf;

#[tracing::instrument(level = "debug", skip_all)]
pub async fn run(args: EnhanceArgs, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let sym = Symbols::detect();

    let mut path_issues = Vec::new();
    if let Some(file) = &args.file {
        path_issues.extend(validate_file_path(&file.to_string_lossy(), FileOp::Read));
    }
    if let Some(out) = &args.output {
        path_issues.extend(validate_file_path(&out.to_string_lossy(), FileOp::Write));
    }
    if !path_issues.is_empty() {
        print_issues(&sym, &path_issues);
        return Err(anyhow::anyhow!("invalid file arguments"));
    }

    let prompt = read_prompt(&args).await?;
    let issues = validate_prompt(&prompt);
    if !issues.is_empty() {
        print_issues(&sym, &issues);
        return Err(anyhow::anyhow!("prompt validation failed"));
    }

    let cfg = PromptBoostConfig::load(config_path).await?;
    let provider_name = args
        .provider
        .clone()
        .unwrap_or_else(|| cfg.default_provider.clone());
    let provider = cfg
        .provider(&provider_name)
        .ok_or_else(|| anyhow::anyhow!("Provider not found: {provider_name}"))?
        .clone();
    if !provider.is_configured() {
        eprintln!("{} Run: {}", sym.tip, configure_hint(&provider_name));
        return Err(anyhow::anyhow!("Provider {provider_name} is not configured"));
    }

    let format = args.format.map(Into::into).unwrap_or(cfg.settings.output_format);
    let options = EnhanceOptions {
        max_tokens: Some(args.max_tokens.unwrap_or(cfg.settings.max_tokens)),
        temperature: Some(args.temperature.unwrap_or(cfg.settings.temperature as f32)),
        format: Some(format),
        stream: args.stream,
        mode: Some(args.mode.map(Into::into).unwrap_or(cfg.settings.default_mode)),
    };
    let request = EnhanceRequest::new(prompt)?
        .with_provider(provider_name.as_str())
        .with_options(options);

    eprintln!("{} Using {} ({})", sym.check, provider.name, provider.model);
    let adapter = create_provider(provider, cfg.request_settings())?;
    tracing::debug!(provider = %adapter.name(), stream = args.stream, "enhancing prompt");

    let response = if args.stream {
        if format == OutputFormat::Markdown {
            println!("Enhanced:");
        }
        let mut stdout = std::io::stdout();
        let mut on_chunk = |chunk: &str| {
            emit_chunk(&mut stdout, chunk);
        };
        let response = adapter.enhance_stream(&request, &mut on_chunk).await?;
        println!();
        if format == OutputFormat::Markdown {
            println!("\n{}", stats_line(&response));
        }
        response
    } else {
        let response = adapter.enhance(&request).await?;
        print!("{}", render(&response, format));
        response
    };

    if let Some(out) = &args.output {
        match tokio::fs::write(out, &response.enhanced).await {
            Ok(()) => eprintln!("{} Enhanced prompt saved to {}", sym.check, out.display()),
            Err(e) => {
                tracing::warn!(path = %out.display(), error = %e, "failed to save enhanced prompt");
                eprintln!("{} Failed to save to file: {e}", sym.error);
            }
        }
    }
    Ok(())
}

async fn read_prompt(args: &EnhanceArgs) -> anyhow::Result<String> {
    if let Some(file) = &args.file {
        let contents = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read file: {}: {e}", file.display()))?;
        return Ok(contents.trim().to_string());
    }
    args.prompt
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Please provide a prompt or use --file option"))
}

/// Writes one streamed chunk. A closed stdout must not abort the request, so
/// failures are only logged.
fn emit_chunk(out: &mut impl Write, chunk: &str) -> bool {
    match out.write_all(chunk.as_bytes()).and_then(|()| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "failed to write streamed chunk");
            false
        }
    }
}

fn render(response: &EnhanceResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => format!("{}\n", response.enhanced),
        OutputFormat::Markdown => format!(
            "## Original\n\n{}\n\n## Enhanced\n\n{}\n\n{}\n",
            response.original,
            response.enhanced,
            stats_line(response)
        ),
    }
}

fn stats_line(response: &EnhanceResponse) -> String {
    format!(
        "Stats: {} tokens used | {}ms response time",
        response.tokens_used, response.response_time_ms
    )
}

fn print_issues(sym: &Symbols, issues: &[Issue]) {
    eprintln!("{} Validation failed:", sym.cross);
    for issue in issues {
        tracing::debug!(field = issue.field, message = %issue.message, "validation issue");
        eprintln!("{} {}", sym.bullet, issue.message);
        if let Some(suggestion) = &issue.suggestion {
            eprintln!("  {} {suggestion}", sym.bullet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> EnhanceResponse {
        EnhanceResponse {
            original: "write a poem".to_string(),
            enhanced: "Write a 12-line poem about autumn.".to_string(),
            provider_name: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
            timestamp: chrono::Utc::now(),
            tokens_used: 9,
            response_time_ms: 321,
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn streamed_chunks_tolerate_a_closed_pipe() {
        let mut buf = Vec::new();
        assert!(emit_chunk(&mut buf, "Hel"));
        assert!(emit_chunk(&mut buf, "lo"));
        assert_eq!(buf, b"Hello");
        assert!(!emit_chunk(&mut ClosedPipe, "lost"));
    }

    #[test]
    fn plain_output_is_only_the_enhanced_prompt() {
        assert_eq!(render(&response(), OutputFormat::Plain), "Write a 12-line poem about autumn.\n");
    }

    #[test]
    fn markdown_output_includes_original_and_stats() {
        let out = render(&response(), OutputFormat::Markdown);
        assert!(out.contains("## Original\n\nwrite a poem"));
        assert!(out.contains("## Enhanced\n\nWrite a 12-line poem about autumn."));
        assert!(out.contains("Stats: 9 tokens used | 321ms response time"));
    }

    #[tokio::test]
    async fn prompt_file_is_trimmed() {
        let path = std::env::temp_dir().join(format!("promptboost-prompt-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "  improve this prompt please \n")
            .await
            .expect("write prompt file");
        let args = EnhanceArgs {
            file: Some(path.clone()),
            ..EnhanceArgs::default()
        };
        assert_eq!(read_prompt(&args).await.expect("read"), "improve this prompt please");
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_prompt_is_an_error() {
        let err = read_prompt(&EnhanceArgs::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Please provide a prompt or use --file option");
    }
}
