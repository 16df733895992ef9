//! Command-line front end for the localization service.
//!
//! Usage:
//!   civic-localization t <key> [fallback]      # Resolve a key in the saved language
//!   civic-localization translate <text> [lang] # Translate English text (default: saved language)
//!   civic-localization detect <text>           # Guess the language of some text
//!   civic-localization lang [code]             # Show or change the saved language
//!   civic-localization languages               # List supported languages
//!   civic-localization cache                   # Cache size and counters; drops expired entries
//!
//! Required environment variables:
//! - TRANSLATION_API_KEY
//!
//! Optional:
//! - TRANSLATION_API_URL (defaults to the OpenAI chat completions endpoint)
//! - TRANSLATION_MODEL (defaults to gpt-4o-mini)
//! - LOCALIZATION_STORE_PATH (defaults to localization_store.json)
//! - DEFAULT_LANGUAGE (defaults to en)
//! - TRANSLATION_CACHE_TTL_DAYS (defaults to 7)

use anyhow::{Context, Result};
use civic_localization::config::Config;
use civic_localization::i18n::LanguageRegistry;
use civic_localization::translation::OpenAiTranslator;
use civic_localization::{ChangeOutcome, Language, LocalizationService};
use tracing::info;

type Service = LocalizationService<OpenAiTranslator>;

fn print_usage() {
    println!(
        r#"Usage: civic-localization <command> [args]

Commands:
  t <key> [fallback]       Resolve a translation key
  translate <text> [lang]  Translate English text
  detect <text>            Detect the language of text
  lang [code]              Show or change the current language
  languages                List supported languages
  cache                    Show cache size and metrics
  help                     Show this message"#
    );
}

fn arg(args: &[String], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .with_context(|| format!("Missing argument: <{}>", name))
}

async fn translate_command(service: &Service, args: &[String]) -> Result<()> {
    let text = arg(args, 2, "text")?;
    let target = match args.get(3) {
        Some(code) => Language::from_code(code)?,
        None => service.current_language(),
    };

    let translated = service
        .translate_free_text(&text, Language::canonical(), target)
        .await;
    println!("{}", translated);
    Ok(())
}

async fn lang_command(service: &Service, args: &[String]) -> Result<()> {
    let Some(code) = args.get(2) else {
        let language = service.current_language();
        println!("{} ({})", language, language.native_name());
        return Ok(());
    };

    match service.change_language(code).await? {
        ChangeOutcome::Unchanged => println!("Already using '{}'", code),
        ChangeOutcome::Changed {
            previous, current, ..
        } => println!("Language changed: {} -> {}", previous, current),
    }
    Ok(())
}

fn languages_command(service: &Service) {
    let current = service.current_language();
    for config in LanguageRegistry::get().list_all() {
        let marker = if config.code == current.code() { "*" } else { " " };
        let status = if config.enabled { "" } else { " (disabled)" };
        println!(
            "{} {:<3} {:<10} {}{}",
            marker, config.code, config.name, config.native_name, status
        );
    }
}

fn cache_command(service: &Service) -> Result<()> {
    let purged = service.cache().purge_expired();
    println!("Cache entries: {} ({} expired entries purged)", service.cache().len(), purged);
    println!("{}", serde_json::to_string_pretty(&service.metrics().report())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when the variables are already set)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("civic_localization=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = &args[1];
    if matches!(command.as_str(), "--help" | "-h" | "help") {
        print_usage();
        return Ok(());
    }

    let config = Config::from_env()?;
    let service = LocalizationService::from_config(&config)?;
    info!(
        "Using store {} with language '{}'",
        config.store_path,
        service.current_language()
    );

    match command.as_str() {
        "t" => {
            let key = arg(&args, 2, "key")?;
            println!("{}", service.t(&key, args.get(3).map(String::as_str)));
            Ok(())
        }
        "translate" => translate_command(&service, &args).await,
        "detect" => {
            let text = arg(&args, 2, "text")?;
            let language = service.detect_language(&text).await;
            println!("{} ({})", language, language.name());
            Ok(())
        }
        "lang" => lang_command(&service, &args).await,
        "languages" => {
            languages_command(&service);
            Ok(())
        }
        "cache" => cache_command(&service),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}
