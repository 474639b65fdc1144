use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cleanup::{CleanupClient, CleanupConfig, HttpFetcher};
use cli::{FontConfig, ThumbnailJobFile, output_filename, with_png_extension};
use color_eyre::eyre::{Result, WrapErr, eyre};
use segmentation::{RembgConfig, RembgSegmenter};
use thumbnail::{
    Concept, FontBackend, Pipeline, PipelineOptions, RenderRequest, TextEngine, TracingObserver,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

type ThumbnailPipeline = Pipeline<HttpFetcher, CleanupClient, RembgSegmenter, FontBackend>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single thumbnail
    Render {
        /// Source artwork URL
        #[arg(long)]
        image_url: String,
        /// Game title, identifier-style names are split into words
        #[arg(long)]
        title: String,
        #[arg(long)]
        provider: String,
        /// Output PNG (`.png` is appended if missing); defaults to `{title}__{provider}.png`
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Background treatment (v1 blurred, v2 sharp)
        #[arg(long, default_value = "v1")]
        concept: Concept,
        /// Seed forwarded to the cleanup service
        #[arg(long)]
        seed: Option<u64>,
        /// Cleanup API key (or set FAL_API_KEY environment variable)
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long, default_value = "Inter-Regular.ttf")]
        regular_font: String,
        #[arg(long, default_value = "Inter-Bold.ttf")]
        bold_font: String,
        /// Path to the rembg segmentation script
        #[arg(long)]
        segment_script: Option<PathBuf>,
    },
    /// Render every job in a TOML or JSON batch file
    Batch {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Cleanup API key (or set FAL_API_KEY environment variable)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Print the JSON schema of the batch file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            image_url,
            title,
            provider,
            output,
            concept,
            seed,
            api_key,
            regular_font,
            bold_font,
            segment_script,
        } => {
            let fonts = FontConfig { regular: regular_font, bold: bold_font };
            let mut segmentation = RembgConfig::default();
            if let Some(script) = segment_script {
                segmentation.script = script;
            }
            let pipeline = build_pipeline(
                resolve_api_key(api_key)?,
                &fonts,
                PipelineOptions::default(),
                CleanupConfig::default(),
                segmentation,
            )?;

            let mut request = RenderRequest::new(image_url, title, provider).with_concept(concept);
            if let Some(seed) = seed {
                request = request.with_seed(seed);
            }
            let output = match output {
                Some(path) => with_png_extension(&path),
                None => PathBuf::from(output_filename(&request.game_title, &request.provider)),
            };
            render_one(&pipeline, &request, &output).await?;
        }
        Commands::Batch { config, api_key } => {
            run_batch(&config, api_key).await?;
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(ThumbnailJobFile);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn resolve_api_key(api_key: Option<String>) -> Result<String> {
    api_key
        .or_else(|| std::env::var("FAL_API_KEY").ok())
        .ok_or_else(|| eyre!("Cleanup API key not provided. Use --api-key or set FAL_API_KEY"))
}

fn build_pipeline(
    api_key: String,
    fonts: &FontConfig,
    options: PipelineOptions,
    cleanup: CleanupConfig,
    segmentation: RembgConfig,
) -> Result<ThumbnailPipeline> {
    let text = TextEngine::new(
        FontBackend::load(&fonts.regular).wrap_err("loading regular font")?,
        FontBackend::load(&fonts.bold).wrap_err("loading bold font")?,
    );
    let fetcher = HttpFetcher::new(&cleanup)?;
    let cleaner = CleanupClient::new(api_key, cleanup)?;
    let pipeline = Pipeline::builder(fetcher, cleaner, RembgSegmenter::new(segmentation), text)
        .options(options)
        .observer(TracingObserver)
        .build()?;
    Ok(pipeline)
}

async fn render_one(
    pipeline: &ThumbnailPipeline,
    request: &RenderRequest,
    output: &Path,
) -> Result<()> {
    let image = pipeline
        .render(request)
        .await
        .wrap_err_with(|| format!("rendering {:?}", request.game_title))?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image.save(output)?;
    info!("Saved {} ({}x{})", output.display(), image.width(), image.height());
    Ok(())
}

async fn run_batch(config_path: &Path, api_key: Option<String>) -> Result<()> {
    let job_file = ThumbnailJobFile::from_file(config_path)?;
    info!("Loaded {} jobs from {}", job_file.jobs.len(), config_path.display());

    let output_dir = PathBuf::from(&job_file.output_dir);
    std::fs::create_dir_all(&output_dir)?;

    let pipeline = Arc::new(build_pipeline(
        resolve_api_key(api_key)?,
        &job_file.fonts,
        job_file.pipeline.clone(),
        job_file.cleanup.clone(),
        job_file.segmentation.clone(),
    )?);
    let permits = Arc::new(Semaphore::new(job_file.max_concurrency.max(1)));

    let mut tasks = JoinSet::new();
    for job in job_file.jobs {
        let pipeline = Arc::clone(&pipeline);
        let permits = Arc::clone(&permits);
        let output = job.output_path(&output_dir);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let result = render_one(&pipeline, &job.request(), &output).await;
            Ok::<_, color_eyre::Report>((job.game_title, result))
        });
    }

    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (title, result) = joined??;
        if let Err(err) = result {
            failures += 1;
            error!("Job {:?} failed: {:?}", title, err);
        }
    }

    if failures > 0 {
        return Err(eyre!("{failures} thumbnail job(s) failed"));
    }
    info!("All thumbnails rendered into {}", output_dir.display());
    Ok(())
}
