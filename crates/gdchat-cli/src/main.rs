use anyhow::Result;
use clap::Parser;

mod app;
mod theme;

#[derive(Parser)]
#[command(name = "gdchat")]
#[command(about = "GDCHAT - terminal chat client for the Gemini API")]
#[command(version)]
struct Cli {
    /// Run a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,

    /// API key (overrides config.toml and GEMINI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Color theme (dark, light)
    #[arg(long, default_value = "dark")]
    theme: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = gdchat_core::Settings::load();

    if let Some(model) = cli.model {
        settings.llm.model = model;
    }
    if let Some(api_key) = cli.api_key {
        settings.llm.api_key = Some(api_key);
    }

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(&settings, &prompt).await?;
    } else {
        app::run_tui(settings, &cli.theme).await?;
    }

    Ok(())
}
