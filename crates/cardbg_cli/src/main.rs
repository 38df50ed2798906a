use std::io::Write;
use std::sync::Arc;
use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use cardbg_core::{GeneratedImage, NotificationSink, ProfileStore, PromptRequest};
use cardbg_inference::InferenceConfig;
use cardbg_pipeline::{
    init_logging, ApplyGate, CancellationToken, Orchestrator, PipelineConfig, TracingSink,
};
use cardbg_scrapers::FetcherConfig;
use cardbg_web::{create_app, AppState};

mod cli;

use cli::{is_confirmation, Cli, Commands, OutputArgs};

fn inference_config(cli: &Cli) -> InferenceConfig {
    InferenceConfig {
        provider: cli.model.clone(),
        api_key: cli.api_key.clone(),
        text_model: cli.text_model.clone(),
        image_model: cli.image_model.clone(),
        request_timeout: cli.generation_timeout.0.max(cli.synthesis_timeout.0),
        ..InferenceConfig::default()
    }
}

fn fetcher_config(cli: &Cli) -> FetcherConfig {
    FetcherConfig {
        timeout: cli.fetch_timeout.0,
        ..FetcherConfig::default()
    }
}

fn build_orchestrator(
    cli: &Cli,
    sink: Arc<dyn NotificationSink>,
    allow_private_hosts: bool,
) -> anyhow::Result<Orchestrator> {
    let pipeline = PipelineConfig {
        synthesis_timeout: cli.synthesis_timeout.0,
        generation_timeout: cli.generation_timeout.0,
        allow_private_hosts,
    };
    let orchestrator = Orchestrator::from_config(&inference_config(cli), fetcher_config(cli), pipeline, sink)
        .context("Failed to initialize the background pipeline")?;
    info!("🧠 Pipeline initialized (using {})", cli.model);
    Ok(orchestrator)
}

async fn generate(cli: &Cli, request: PromptRequest, output: &OutputArgs) -> anyhow::Result<()> {
    let target = match &output.apply_to {
        Some(profile_id) => Some((profile_id.as_str(), open_apply_target(cli, profile_id).await?)),
        None => None,
    };

    let sink: Arc<dyn NotificationSink> = Arc::new(TracingSink);
    let orchestrator = build_orchestrator(cli, sink.clone(), true)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let image = match orchestrator.run_with_cancel(request, cancel).await {
        Ok(image) => image,
        Err(err) => bail!("{}: {}", err.title(), err.user_message()),
    };

    write_image(&image, output)?;

    if let Some((profile_id, store)) = target {
        if !output.yes && !confirm(profile_id).await? {
            info!("🙅 Background not applied");
            return Ok(());
        }
        let gate = ApplyGate::new(store, sink);
        if let Err(err) = gate.apply(profile_id, &image).await {
            bail!("{}: {}", err.title(), err.user_message());
        }
    }
    Ok(())
}

/// Opens the store the result will be applied to and checks the profile
/// exists, so a bad target fails before any model is called.
async fn open_apply_target(cli: &Cli, profile_id: &str) -> anyhow::Result<Arc<dyn ProfileStore>> {
    if cli.storage == "memory" {
        bail!("--apply-to needs persistent storage, pass --storage sqlite --database <FILE>");
    }
    let store = cardbg_storage::create_store(&cli.storage, cli.database.as_deref()).await?;
    if store.get(profile_id).await?.is_none() {
        bail!("Profile {} not found in {} storage", profile_id, cli.storage);
    }
    Ok(store)
}

fn write_image(image: &GeneratedImage, output: &OutputArgs) -> anyhow::Result<()> {
    match &output.out {
        Some(path) => {
            let bytes = image.decode()?;
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write image to {}", path.display()))?;
            info!("💾 Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => println!("{}", image.data_uri()),
    }
    Ok(())
}

async fn confirm(profile_id: &str) -> anyhow::Result<bool> {
    let question = format!("Apply this background to profile {}? [y/N] ", profile_id);
    let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut stderr = std::io::stderr();
        stderr.write_all(question.as_bytes())?;
        stderr.flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok(answer)
    })
    .await??;
    Ok(is_confirmation(&answer))
}

async fn serve(cli: &Cli, addr: &str, allow_private_hosts: bool) -> anyhow::Result<()> {
    let sink: Arc<dyn NotificationSink> = Arc::new(TracingSink);
    let orchestrator = build_orchestrator(cli, sink.clone(), allow_private_hosts)?;
    let store = cardbg_storage::create_store(&cli.storage, cli.database.as_deref()).await?;
    info!("🏦 Profile store initialized (using {})", cli.storage);

    let state = AppState {
        orchestrator,
        apply_gate: ApplyGate::new(store.clone(), sink),
        store,
        max_image_bytes: fetcher_config(cli).max_image_bytes,
    };
    cardbg_web::serve(create_app(state), addr)
        .await
        .with_context(|| format!("Failed to serve on {}", addr))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Website { url, output } => {
            info!("🌐 Generating a background from {}", url);
            generate(&cli, PromptRequest::website(url.as_str()), output).await
        }
        Commands::Prompt { text, output } => {
            let text = text.join(" ");
            info!("📝 Generating a background from a description");
            generate(&cli, PromptRequest::freeform(text), output).await
        }
        Commands::Serve {
            addr,
            allow_private_hosts,
        } => serve(&cli, addr, *allow_private_hosts).await,
    }
}
