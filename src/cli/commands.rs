//! Command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::app::{AppContainer, EncodeOrchestrator, EncodeRequest, JobReport, Submission};
use crate::cli::args::{EncodeArgs, PreviewArgs, ProbeArgs, ProgressMode, SettingsCommand};
use crate::cli::{Cli, Commands};
use crate::domain::model::*;
use crate::editor::GestureScript;
use crate::engine::progress::{observe, ConsoleProgress, JobObserver, JsonProgress, NoOpProgress};
use crate::utils::format_file_size;
use crate::utils::time::parse_timestamp;

/// Dispatch a parsed command line
pub async fn run(cli: Cli, container: &dyn AppContainer) -> Result<()> {
    match cli.command {
        Commands::Encode(args) => encode(container, args).await,
        Commands::Preview(args) => preview(container, args).await,
        Commands::Probe(args) => probe(container, args).await,
        Commands::Settings(command) => settings(container, command).await,
    }
}

/// Execute the encode command
pub async fn encode(container: &dyn AppContainer, args: EncodeArgs) -> Result<()> {
    let orchestrator = container.orchestrator();
    let tolerance = container.config().editor.aspect_tolerance;

    let mut settings = container
        .settings_store()
        .load_settings()
        .await
        .context("Failed to load encoding settings")?;
    if args.fps.is_some() {
        settings.fps = args.fps;
    }
    if args.height.is_some() {
        settings.height = args.height;
    }
    if args.mpdecimate.is_some() {
        settings.mpdecimate = args.mpdecimate;
    }
    settings.validate()?;

    let gestures = args
        .gestures
        .as_deref()
        .map(GestureScript::from_file)
        .transpose()?;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let observer: Box<dyn JobObserver> = match args.progress {
        ProgressMode::Pretty => Box::new(ConsoleProgress::new()),
        ProgressMode::Json => Box::new(JsonProgress),
        ProgressMode::None => Box::new(NoOpProgress),
    };
    let rx = orchestrator.watch();
    let watcher = tokio::spawn(async move { observe(rx, observer.as_ref()).await });

    let total = args.inputs.len();
    let mut failures = 0;
    for path in &args.inputs {
        match encode_one(&orchestrator, path, &args, &settings, gestures.as_ref(), tolerance).await {
            Ok(true) => {}
            Ok(false) => failures += 1,
            Err(e) => {
                warn!(input = %path.display(), error = %e, "Input skipped");
                eprintln!("{}: {:#}", path.display(), e);
                failures += 1;
            }
        }
    }

    orchestrator.shutdown().await;
    tokio::task::yield_now().await;
    watcher.abort();

    if failures > 0 {
        bail!("{} of {} inputs failed", failures, total);
    }
    info!(inputs = total, "Encode command completed");
    Ok(())
}

async fn encode_one(
    orchestrator: &Arc<EncodeOrchestrator>,
    path: &Path,
    args: &EncodeArgs,
    settings: &EncodingSettings,
    gestures: Option<&GestureScript>,
    tolerance: f64,
) -> Result<bool> {
    let input = InputFile::from_path(path)?;

    let selection = match gestures {
        Some(script) => {
            let media = orchestrator.probe(&input).await.context("Failed to probe input")?;
            Some(script.replay(&media, None, tolerance)?)
        }
        None => selection_from_flags(orchestrator, &input, args).await?,
    };

    let request = EncodeRequest {
        input: input.clone(),
        settings: settings.clone(),
        selection,
    };
    let mut submission = orchestrator.submit(request).await;

    if submission == Submission::EditorRequested {
        // no gestures: the editor commits its initial state
        let media = orchestrator.probe(&input).await.context("Failed to probe input")?;
        let selection = GestureScript::default().replay(&media, None, tolerance)?;
        submission = orchestrator
            .commit_edit(selection)
            .await
            .context("Editor lost the pending input")?;
    }

    match submission {
        Submission::Finished(report) => save_report(&input, report, &args.out_dir).await,
        Submission::Busy => {
            warn!(input = %input.name, "Engine busy, input dropped");
            Ok(false)
        }
        Submission::EditorRequested => {
            orchestrator.cancel_edit();
            Ok(false)
        }
    }
}

async fn selection_from_flags(
    orchestrator: &EncodeOrchestrator,
    input: &InputFile,
    args: &EncodeArgs,
) -> Result<Option<EditSelection>> {
    let crop = args.crop.as_deref().map(SourceCropBox::parse).transpose()?;
    let height_override = args.original_height.then_some(HeightOverride::Original);

    let trim = if args.start.is_some() || args.end.is_some() {
        let start = args.start.as_deref().map(parse_timestamp).transpose()?;
        let end = args.end.as_deref().map(parse_timestamp).transpose()?;
        let media = orchestrator.probe(input).await.context("Failed to probe input")?;
        Some(TrimSelection::new(
            start.unwrap_or(0.0),
            end.unwrap_or(media.duration).min(media.duration),
            media.duration,
        )?)
    } else {
        None
    };

    let selection = EditSelection {
        trim,
        crop,
        height_override,
    };
    Ok((!selection.is_empty()).then_some(selection))
}

async fn save_report(input: &InputFile, report: JobReport, out_dir: &Path) -> Result<bool> {
    let Some(output) = report.output else {
        let reason = report.error.unwrap_or_else(|| report.status.to_string());
        eprintln!("{}: {}", input.name, reason);
        return Ok(false);
    };

    let destination = out_dir.join(&output.name);
    tokio::fs::copy(&output.location, &destination)
        .await
        .with_context(|| format!("Failed to write {}", destination.display()))?;
    println!(
        "{} -> {} ({})",
        input.name,
        destination.display(),
        format_file_size(output.size as u64)
    );
    Ok(true)
}

/// Execute the preview command
pub async fn preview(container: &dyn AppContainer, args: PreviewArgs) -> Result<()> {
    let orchestrator = container.orchestrator();
    let input = InputFile::from_path(&args.input)?;

    if input.has_native_preview() && !args.force {
        println!("{} plays natively; no preview needed", input.name);
        return Ok(());
    }

    let result = orchestrator.generate_preview(&input).await;
    orchestrator.shutdown().await;
    let preview = result.context("Failed to generate preview")?;

    let destination = args
        .output
        .unwrap_or_else(|| default_preview_path(&args.input, &preview.name));
    tokio::fs::write(&destination, &preview.data)
        .await
        .with_context(|| format!("Failed to write {}", destination.display()))?;
    println!(
        "{} -> {} ({})",
        input.name,
        destination.display(),
        format_file_size(preview.size() as u64)
    );
    Ok(())
}

fn default_preview_path(input: &Path, preview_name: &str) -> PathBuf {
    let candidate = input.with_file_name(preview_name);
    if candidate == input {
        input.with_file_name(format!("preview-{}", preview_name))
    } else {
        candidate
    }
}

/// Execute the probe command
pub async fn probe(container: &dyn AppContainer, args: ProbeArgs) -> Result<()> {
    let orchestrator = container.orchestrator();
    let input = InputFile::from_path(&args.input)?;

    let result = orchestrator.probe(&input).await;
    orchestrator.shutdown().await;
    let media = result.context("Failed to probe input")?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&media).context("Failed to serialize media info")?;
        println!("{}", json);
    } else {
        println!("File:     {}", input.name);
        println!("Duration: {}", crate::utils::time::format_timestamp(media.duration));
        println!("Size:     {}x{}", media.width, media.height);
    }
    Ok(())
}

/// Execute a settings subcommand
pub async fn settings(container: &dyn AppContainer, command: SettingsCommand) -> Result<()> {
    let store = container.settings_store();

    let settings = match command {
        SettingsCommand::Show { json } => {
            let settings = store.load_settings().await.context("Failed to load settings")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
                return Ok(());
            }
            settings
        }
        SettingsCommand::Set {
            fps,
            height,
            mpdecimate,
        } => {
            let current = store.load_settings().await.context("Failed to load settings")?;
            let field = |given: Option<String>, current: Option<u32>| {
                given.unwrap_or_else(|| current.map(|v| v.to_string()).unwrap_or_default())
            };
            let updated = EncodingSettings::from_form(
                &field(fps, current.fps),
                &field(height, current.height),
                &field(mpdecimate, current.mpdecimate),
            )?;
            store.save_settings(&updated).await.context("Failed to save settings")?;
            updated
        }
        SettingsCommand::Reset => store.reset_settings().await.context("Failed to reset settings")?,
    };

    print_settings(&settings, container.config_path());
    Ok(())
}

fn print_settings(settings: &EncodingSettings, path: &Path) {
    let show = |v: Option<u32>| v.map_or_else(|| "(unset)".to_string(), |v| v.to_string());
    println!("Config:     {}", path.display());
    println!("fps:        {}", show(settings.fps));
    println!("height:     {}", show(settings.height));
    println!("mpdecimate: {}", show(settings.mpdecimate));
}
