//! `config`, `test` and `providers` subcommands.

use crate::config::{PromptBoostConfig, ProviderUpdate, default_config_path};
use crate::output::{Symbols, configure_hint, result_row, summary};
use crate::{ConfigAction, SetArgs};
use pb_llm::models::{recommended_model, validate_model};
use pb_llm::{StreamStrategy, TestResult, ValidationError, Vendor, check_provider, default_http_client};
use std::io::Write;
use std::path::{Path, PathBuf};

pub async fn config(action: ConfigAction, path: Option<PathBuf>) -> anyhow::Result<()> {
    let sym = Symbols::detect();
    let file = path.clone().unwrap_or_else(default_config_path);
    match action {
        ConfigAction::Show => {
            let cfg = PromptBoostConfig::load(path).await?;
            println!("{} Current Configuration\n", sym.config);
            println!("Default Provider: {}", cfg.default_provider);
            println!("Config Path: {}", file.display());
            println!("\nProviders:");
            for (name, provider) in cfg.ordered_providers() {
                let status = if provider.is_configured() {
                    format!("{} Configured", sym.check)
                } else {
                    format!("{} Not configured", sym.cross)
                };
                println!("  {name:<12} {status} ({})", provider.model);
            }
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", file.display());
            Ok(())
        }
        ConfigAction::Reset => {
            let mut cfg = PromptBoostConfig::load_file(path).await?;
            cfg.reset();
            cfg.save(&file).await?;
            println!("{} Configuration reset to defaults", sym.check);
            Ok(())
        }
        ConfigAction::Set(args) => set(args, &file, &sym).await,
        ConfigAction::Remove { provider } => {
            let mut cfg = PromptBoostConfig::load_file(path).await?;
            cfg.remove_provider(&provider)?;
            cfg.save(&file).await?;
            println!("{} Provider '{provider}' configuration removed.", sym.check);
            Ok(())
        }
    }
}

async fn set(args: SetArgs, file: &Path, sym: &Symbols) -> anyhow::Result<()> {
    let mut cfg = PromptBoostConfig::load_file(Some(file.to_path_buf())).await?;

    if let Some(name) = args.default_provider {
        cfg.set_default_provider(&name)?;
        cfg.save(file).await?;
        println!("{} Default provider set to: {name}", sym.check);
        return Ok(());
    }

    let Some(name) = args.provider else {
        println!(
            "{} No action taken. Use --default <provider> or --provider <name> with --key, --model or --base-url.",
            sym.warning
        );
        return Ok(());
    };
    if args.key.is_none() && args.model.is_none() && args.base_url.is_none() {
        println!(
            "{} No action taken. When using --provider, you must also specify --key, --model or --base-url.",
            sym.warning
        );
        return Ok(());
    }

    if let Some(model) = &args.model {
        let check = validate_model(&name, model);
        for warning in &check.warnings {
            println!("{} {warning}", sym.warning);
        }
        if !check.is_valid() {
            for error in &check.errors {
                eprintln!("{} {error}", sym.error);
            }
            if let Some(suggested) = Vendor::from_name(&name).and_then(|v| recommended_model(v, model)) {
                eprintln!("{} Try: --model {suggested}", sym.tip);
            }
            return Err(ValidationError::UnknownModel {
                provider: name,
                model: model.clone(),
            }
            .into());
        }
    }

    let enabling = args.key.is_some();
    let became_default = cfg.set_provider(
        &name,
        ProviderUpdate {
            api_key: args.key,
            model: args.model,
            base_url: args.base_url,
        },
    )?;
    cfg.save(file).await?;

    if became_default {
        println!("{} {name} configured and set as default provider", sym.check);
    } else {
        println!("{} Configuration updated for provider: {name}", sym.check);
    }
    if enabling {
        println!("  Provider {name} enabled.");
    }
    Ok(())
}

pub async fn test(provider: Option<String>, path: Option<PathBuf>) -> anyhow::Result<()> {
    let sym = Symbols::detect();
    let cfg = PromptBoostConfig::load(path).await?;
    let settings = cfg.request_settings();
    let http = default_http_client();

    if let Some(name) = provider {
        println!("{} Testing provider: {name}\n", sym.test);
        let Some(p) = cfg.provider(&name) else {
            return Err(anyhow::anyhow!("Provider not found: {name}"));
        };
        if !p.is_configured() {
            eprintln!("{} Run: {}", sym.tip, configure_hint(&name));
            return Err(anyhow::anyhow!("Provider {name} is not configured"));
        }
        let result = check_provider(p, settings, http).await;
        print_result(&sym, &result);
        return if result.success {
            Ok(())
        } else {
            Err(anyhow::anyhow!("provider {name} failed its connectivity test"))
        };
    }

    println!("{} Testing all configured providers\n", sym.test);
    let enabled = cfg.enabled_providers();
    if enabled.is_empty() {
        println!("{} No providers are configured", sym.warning);
        println!("Configure a provider first:");
        println!("  {}", configure_hint("openai"));
        return Ok(());
    }

    let mut results: Vec<TestResult> = Vec::with_capacity(enabled.len());
    for p in enabled {
        print!("Testing {}... ", p.name);
        let _ = std::io::stdout().flush();
        let result = check_provider(p, settings, http.clone()).await;
        println!("{}", if result.success { sym.check } else { sym.cross });
        results.push(result);
    }

    println!("\nTest Results:");
    for result in &results {
        print_result(&sym, result);
    }
    let line = summary(&results);
    if results.iter().all(|r| r.success) {
        println!("\n{} All tests passed! ({line})", sym.check);
    } else {
        println!("\n{} Some tests failed ({line})", sym.warning);
    }
    Ok(())
}

fn print_result(sym: &Symbols, result: &TestResult) {
    println!("{}", result_row(sym, result));
    if let Some(error) = result.error.as_deref().filter(|_| !result.success) {
        println!("    Error: {error}");
    }
}

pub fn providers() {
    println!("Available providers:");
    for vendor in Vendor::ALL {
        let streaming = match vendor.stream_strategy() {
            StreamStrategy::Native => "native streaming",
            StreamStrategy::Simulated => "simulated streaming",
        };
        println!("  {:<10} - {} ({streaming})", vendor.name(), vendor.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_config() -> PathBuf {
        std::env::temp_dir()
            .join(format!("promptboost-cmd-{}", Uuid::new_v4()))
            .join("config.toml")
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn set_key_then_remove_round_trips_through_disk() {
        let path = temp_config();
        config(
            ConfigAction::Set(SetArgs {
                provider: Some("anthropic".to_string()),
                key: Some("sk-ant".to_string()),
                ..SetArgs::default()
            }),
            Some(path.clone()),
        )
        .await
        .expect("set succeeds");

        let cfg = PromptBoostConfig::load_file(Some(path.clone())).await.expect("reload");
        assert_eq!(cfg.default_provider, "anthropic");
        assert!(cfg.provider("anthropic").expect("entry").is_configured());

        config(
            ConfigAction::Remove {
                provider: "anthropic".to_string(),
            },
            Some(path.clone()),
        )
        .await
        .expect("remove succeeds");
        let cfg = PromptBoostConfig::load_file(Some(path.clone())).await.expect("reload");
        assert!(!cfg.provider("anthropic").expect("entry").is_configured());

        cleanup(&path);
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_saving() {
        let path = temp_config();
        let err = config(
            ConfigAction::Set(SetArgs {
                provider: Some("openai".to_string()),
                model: Some("gpt-99".to_string()),
                ..SetArgs::default()
            }),
            Some(path.clone()),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::UnknownModel { .. })
        ));
        let cfg = PromptBoostConfig::load_file(Some(path.clone())).await.expect("reload");
        assert_eq!(cfg.provider("openai").expect("entry").model, "gpt-4.1-mini");

        cleanup(&path);
    }

    #[tokio::test]
    async fn default_provider_must_exist() {
        let path = temp_config();
        let err = config(
            ConfigAction::Set(SetArgs {
                default_provider: Some("mistral".to_string()),
                ..SetArgs::default()
            }),
            Some(path.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown provider: mistral");
        cleanup(&path);
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let path = temp_config();
        let mut cfg = PromptBoostConfig::default();
        cfg.settings.retries = 9;
        cfg.save(&path).await.expect("save");
        config(ConfigAction::Reset, Some(path.clone())).await.expect("reset");
        let cfg = PromptBoostConfig::load_file(Some(path.clone())).await.expect("reload");
        assert_eq!(cfg, PromptBoostConfig::default());
        cleanup(&path);
    }
}
