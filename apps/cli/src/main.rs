use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, load_settings_from, HttpProjectApi, ImageFile, IngestEvent,
    ProjectViewController, SaveStatus, UploadOutcome,
};
use shared::domain::ProjectName;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Manage screenshot projects on a projects API server")]
struct Cli {
    /// Settings file; defaults to `screenshots.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured API base URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List project names.
    Projects,
    /// Create a project.
    Create { name: String },
    /// Show a project's images and readme.
    Show { project: String },
    /// Upload image files in the given order.
    Upload {
        project: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete one image by its server filename.
    Delete { project: String, filename: String },
    #[command(subcommand)]
    Readme(ReadmeCommand),
}

#[derive(Subcommand, Debug)]
enum ReadmeCommand {
    /// Print the readme.
    Get { project: String },
    /// Replace the readme with TEXT or the contents of --file.
    Set {
        project: String,
        text: Option<String>,
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    let api = HttpProjectApi::new(&settings)
        .with_context(|| format!("cannot use API at '{}'", settings.api_base_url))?;
    tracing::debug!(base_url = %api.base_url(), "using projects API");
    let view = ProjectViewController::new(Arc::new(api), &settings);

    match cli.command {
        Command::Projects => {
            for name in view.list_projects().await? {
                println!("{name}");
            }
        }
        Command::Create { name } => {
            let project = view.create_project(&name).await?;
            if project.created {
                println!("created {}", project.name);
            } else {
                println!("{} already exists", project.name);
            }
        }
        Command::Show { project } => {
            open(&view, &project).await?;
            let Some(detail) = view.detail().await else {
                bail!("project '{project}' has no detail");
            };
            println!("{}", detail.name);
            for image in &detail.images {
                println!("  {}  {}", image.filename, image.url);
            }
            if !detail.readme.is_empty() {
                println!();
                println!("{}", detail.readme);
            }
        }
        Command::Upload { project, files } => {
            open(&view, &project).await?;
            let mut images = Vec::with_capacity(files.len());
            for path in &files {
                images.push(ImageFile::from_path(path).await?);
            }
            let offered = images.len();
            let mut event = IngestEvent::drop_files(images);
            match view.ingest(&mut event).await {
                UploadOutcome::Finished(report) => {
                    for image in &report.uploaded {
                        println!("uploaded {}", image.filename);
                    }
                    let ignored = offered - report.uploaded.len() - report.skipped
                        - usize::from(report.failure.is_some());
                    if ignored > 0 {
                        eprintln!("ignored {ignored} file(s) that are not images");
                    }
                    if let Some(failure) = report.failure {
                        bail!(
                            "upload of '{}' failed: {}; {} file(s) not attempted",
                            failure.file_name,
                            view.error().await.unwrap_or_else(|| failure.error.to_string()),
                            report.skipped
                        );
                    }
                }
                UploadOutcome::Empty => bail!("none of the given files is an image"),
                UploadOutcome::Busy => bail!("another upload is still running"),
            }
        }
        Command::Delete { project, filename } => {
            open(&view, &project).await?;
            if !view.delete_image(&filename).await {
                bail!(view
                    .error()
                    .await
                    .unwrap_or_else(|| "Failed to delete image".to_string()));
            }
            println!("deleted {filename}");
        }
        Command::Readme(ReadmeCommand::Get { project }) => {
            open(&view, &project).await?;
            if let Some(detail) = view.detail().await {
                println!("{}", detail.readme);
            }
        }
        Command::Readme(ReadmeCommand::Set {
            project,
            text,
            file,
        }) => {
            let content = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read '{}'", path.display()))?,
                (None, None) => bail!("pass the readme text or --file"),
            };
            open(&view, &project).await?;
            if !view.edit_readme(content).await {
                bail!("project '{project}' is not loaded");
            }
            match view.save_readme_now().await {
                Some(SaveStatus::Error) => {
                    let message = match view.autosave().await {
                        Some(autosave) => autosave.snapshot().error,
                        None => None,
                    };
                    bail!(message.unwrap_or_else(|| "Failed to save README".to_string()));
                }
                Some(status) => println!("readme {}", status.as_str()),
                None => bail!("project '{project}' is not loaded"),
            }
        }
    }

    Ok(())
}

/// Selects `raw` and fails with the view's error when its detail did not load.
async fn open(view: &ProjectViewController, raw: &str) -> Result<()> {
    let name = ProjectName::parse(raw)?;
    view.select_project(Some(name.clone())).await;
    if let Some(message) = view.error().await {
        bail!("{name}: {message}");
    }
    Ok(())
}
