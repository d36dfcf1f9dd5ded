//! CLI for brandgen - branded image generation.

use brandgen::image::ImageProviderKind;
use brandgen::pipeline::{provider_from_config, Pipeline, PromptJob};
use brandgen::scaffold;
use brandgen::Config;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "brandgen")]
#[command(about = "Generate branded marketing images in every configured size")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process prompts through the branding pipeline
    Run(RunArgs),

    /// Write a starter config, output directories and placeholder logo
    Init(InitArgs),

    /// List providers and check the configured one
    Providers(ProvidersArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to the config file
    #[arg(short, long, default_value = scaffold::CONFIG_FILE)]
    config: PathBuf,

    /// Prompt to process (repeatable)
    #[arg(short, long)]
    prompt: Vec<String>,

    /// Output name for each --prompt, in order
    #[arg(short, long)]
    name: Vec<String>,

    /// JSON file with an array of prompts or {prompt, name} objects
    #[arg(long, conflicts_with = "prompt")]
    prompts: Option<PathBuf>,

    /// Override the configured provider
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Skip the completion notification
    #[arg(long)]
    no_notify: bool,
}

#[derive(Args)]
struct InitArgs {
    /// Directory to set up
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Overwrite an existing config.json
    #[arg(short, long)]
    force: bool,
}

#[derive(Args)]
struct ProvidersArgs {
    /// Path to the config file
    #[arg(short, long, default_value = scaffold::CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Placeholder,
    Gemini,
}

impl From<ProviderArg> for ImageProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Placeholder => ImageProviderKind::Placeholder,
            ProviderArg::Gemini => ImageProviderKind::Gemini,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Run(args) => run(args, cli.json).await,
        Commands::Init(args) => init(args, cli.json),
        Commands::Providers(args) => list_providers(args, cli.json).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Configuration problems exit with 2, anything else with 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<brandgen::Error>() {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

fn collect_jobs(args: &RunArgs) -> anyhow::Result<Vec<PromptJob>> {
    if let Some(ref path) = args.prompts {
        return Ok(PromptJob::load_file(path)?);
    }
    if args.prompt.is_empty() {
        if !args.name.is_empty() {
            anyhow::bail!("--name requires --prompt");
        }
        return Ok(PromptJob::samples());
    }
    if args.name.len() > args.prompt.len() {
        anyhow::bail!("more --name values than --prompt values");
    }

    Ok(args
        .prompt
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            let job = PromptJob::new(prompt);
            match args.name.get(i) {
                Some(name) => job.with_name(name),
                None => job,
            }
        })
        .collect())
}

async fn run(args: RunArgs, json_output: bool) -> anyhow::Result<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(provider) = args.provider {
        config.api.provider = provider.into();
    }
    if args.no_notify {
        config.notification.enabled = false;
    }

    let jobs = collect_jobs(&args)?;
    let pipeline = Pipeline::from_config(config)?;

    if !json_output {
        println!("{}", "=".repeat(60));
        println!("BRANDED IMAGE GENERATION");
        println!("{}", "=".repeat(60));
        println!(
            "Provider: {} | Prompts: {}",
            pipeline.provider().name(),
            jobs.len()
        );
    }

    let report = pipeline.run(&jobs).await;

    if json_output {
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "prompt": f.prompt,
                    "name": f.name,
                    "stage": f.stage.to_string(),
                    "error": f.error.to_string(),
                })
            })
            .collect();
        let result = serde_json::json!({
            "submitted": report.submitted,
            "completed": report.results.len(),
            "results": report.results,
            "failures": failures,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for failure in &report.failures {
            println!(
                "Failed: {} ({}): {}",
                failure.name, failure.stage, failure.error
            );
        }
        println!("\n{}", "=".repeat(60));
        println!("Processing complete! {}", report.summary());
        println!(
            "Output directory: {}",
            pipeline.config().storage.output_directory.display()
        );
        println!("{}", "=".repeat(60));
    }

    Ok(())
}

fn init(args: InitArgs, json_output: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.dir)?;
    let report = scaffold::init(&args.dir, args.force)?;

    if json_output {
        let result = serde_json::json!({
            "config_written": report.config_written.as_ref().map(|p| p.display().to_string()),
            "logo_written": report.logo_written.as_ref().map(|p| p.display().to_string()),
            "output_directory": report.output_directory.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match report.config_written {
        Some(ref path) => println!("Created {}", path.display()),
        None => println!("Kept existing {} (use --force to overwrite)", scaffold::CONFIG_FILE),
    }
    println!("Created directories under {}", report.output_directory.display());
    if let Some(ref logo) = report.logo_written {
        println!("Created placeholder logo ({})", logo.display());
    }
    println!();
    println!("Next steps:");
    println!("  1. Set GEMINI_API_KEY (or api.gemini_api_key) and api.provider = \"gemini\"");
    println!("  2. Replace the placeholder logo with your brand logo");
    println!("  3. brandgen run");
    Ok(())
}

async fn list_providers(args: ProvidersArgs, json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ProviderInfo {
        name: &'static str,
        kind: &'static str,
        env_var: Option<&'static str>,
        enabled: bool,
    }

    let providers = vec![
        ProviderInfo {
            name: "Placeholder (offline)",
            kind: "placeholder",
            env_var: None,
            enabled: true,
        },
        ProviderInfo {
            name: "Gemini (Google)",
            kind: "gemini",
            env_var: Some("GEMINI_API_KEY"),
            enabled: cfg!(feature = "gemini-image"),
        },
    ];

    // Health of the configured provider, when a config is present
    let health = if args.config.exists() {
        let config = Config::load(&args.config)?;
        let kind = config.api.provider;
        let status = match provider_from_config(&config) {
            Ok(provider) => match provider.health_check().await {
                Ok(()) => "ok".to_string(),
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };
        Some((kind, status))
    } else {
        None
    };

    if json_output {
        let result = serde_json::json!({
            "providers": providers,
            "configured": health.as_ref().map(|(kind, status)| serde_json::json!({
                "kind": kind,
                "status": status,
            })),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Available providers:\n");
        for p in &providers {
            let status = if p.enabled { "✓" } else { "✗" };
            println!("  {} {} ({})", status, p.name, p.kind);
            if let Some(var) = p.env_var {
                println!("    API key: {}", var);
            }
        }
        if let Some((kind, status)) = health {
            println!("\nConfigured: {} - {}", kind, status);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_two() {
        let fatal = anyhow::Error::new(brandgen::Error::Config("no colors".into()));
        assert_eq!(exit_code(&fatal), 2);

        let other = anyhow::Error::new(brandgen::Error::Notification("503".into()));
        assert_eq!(exit_code(&other), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("--name requires --prompt")), 1);
    }
}
