//! `docmark` command line: batch import, projection, export, and headless
//! replay of recorded gestures against an annotation session.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dm_core::analysis::{AnalysisItem, AnalysisSource, MountGuard, SourceError, parse_batch};
use dm_core::geometry::source_to_target;
use dm_core::id::AnnotationId;
use dm_core::{EditorConfig, PageRect, PixelBox, Size, to_pixels};
use dm_editor::{AnnotationSession, DrawContext, InputEvent, Signal};
use dm_render::{ImageSurface, ViewportTracker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "docmark")]
#[command(about = "Normalized bounding-box annotations over rendered documents")]
pub struct Cli {
    /// Editor config JSON. Keys not present keep their defaults.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert an analysis batch into annotation records.
    Import {
        #[arg(value_name = "ANALYSIS")]
        analysis: PathBuf,
        /// Existing records to append to.
        #[arg(long, value_name = "FILE")]
        records: Option<PathBuf>,
    },
    /// Print every record's pixel box on a page of the given size.
    Project {
        #[arg(value_name = "RECORDS")]
        records: PathBuf,
        #[command(flatten)]
        page: PageArgs,
        /// Reference resolution the normalized boxes were produced at.
        #[arg(long, requires = "source_height")]
        source_width: Option<f64>,
        #[arg(long, requires = "source_width")]
        source_height: Option<f64>,
    },
    /// Print the COCO-style summary for a page of the given size.
    Coco {
        #[arg(value_name = "RECORDS")]
        records: PathBuf,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Fit an image into a container and print the settled page rectangle.
    Fit {
        #[arg(long)]
        container_width: f64,
        #[arg(long)]
        container_height: f64,
        /// Natural image size; omit while the image is not loaded.
        #[arg(long, requires = "image_height")]
        image_width: Option<f64>,
        #[arg(long, requires = "image_width")]
        image_height: Option<f64>,
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
    },
    /// Run a recorded step script through an editing session and print the
    /// resulting records and signals.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        /// Records to start from.
        #[arg(long, value_name = "FILE")]
        records: Option<PathBuf>,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Debug, Clone, Copy, clap::Args)]
struct PageArgs {
    #[arg(long, default_value_t = 800.0)]
    page_width: f64,
    #[arg(long, default_value_t = 1000.0)]
    page_height: f64,
}

impl PageArgs {
    fn rect(self) -> Result<PageRect> {
        let page = PageRect::new(self.page_width, self.page_height);
        anyhow::ensure!(
            page.is_usable(),
            "page size {}x{} has no area",
            self.page_width,
            self.page_height
        );
        Ok(page)
    }
}

/// Parse `args` and write the command's JSON output to stdout.
pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let stdout = std::io::stdout();
    run_with(args, &mut stdout.lock())
}

/// [`run`] with an explicit output sink.
pub fn run_with<I, T, W>(args: I, out: &mut W) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
{
    let cli = Cli::try_parse_from(args)?;
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;

    let value = match cli.command {
        Commands::Import { analysis, records } => {
            runtime.block_on(run_import(config, &analysis, records.as_deref()))?
        }
        Commands::Project {
            records,
            page,
            source_width,
            source_height,
        } => {
            let source = source_width.zip(source_height).map(|(w, h)| Size::new(w, h));
            run_project(config, &records, page.rect()?, source)?
        }
        Commands::Coco { records, page } => {
            let session = session_from(config, Some(&records))?;
            serde_json::to_value(dm_core::export::coco_summary(session.store(), &page.rect()?))?
        }
        Commands::Fit {
            container_width,
            container_height,
            image_width,
            image_height,
            zoom,
        } => {
            let surface = ImageSurface {
                container: Some(Size::new(container_width, container_height)),
                natural: image_width.zip(image_height).map(|(w, h)| Size::new(w, h)),
                zoom,
                pan: (0.0, 0.0),
            };
            let mut tracker = ViewportTracker::new(config.tracker);
            let page = runtime.block_on(tracker.settle(&surface));
            serde_json::to_value(page)?
        }
        Commands::Replay {
            script,
            records,
            page,
        } => run_replay(config, &script, records.as_deref(), page.rect()?)?,
    };

    serde_json::to_writer_pretty(&mut *out, &value)?;
    writeln!(out)?;
    Ok(())
}

fn session_from(config: EditorConfig, records: Option<&Path>) -> Result<AnnotationSession> {
    let mut session = AnnotationSession::new(config);
    if let Some(path) = records {
        let text =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        session
            .load_json(&text)
            .with_context(|| format!("invalid records in {}", path.display()))?;
    }
    Ok(session)
}

fn records_value(session: &AnnotationSession) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(session.store().records())?)
}

// ─── import ──────────────────────────────────────────────────────────────

/// An analysis batch stored on disk.
struct FileSource(PathBuf);

impl AnalysisSource for FileSource {
    async fn fetch(&self) -> Result<Vec<AnalysisItem>, SourceError> {
        let text = tokio::fs::read_to_string(&self.0)
            .await
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", self.0.display())))?;
        parse_batch(&text)
    }
}

async fn run_import(
    config: EditorConfig,
    analysis: &Path,
    records: Option<&Path>,
) -> Result<serde_json::Value> {
    let mut session = session_from(config, records)?;
    let added = session
        .load_analysis(&FileSource(analysis.to_path_buf()), &MountGuard::mounted())
        .await?;
    log::info!("imported {added} annotations from {}", analysis.display());
    records_value(&session)
}

// ─── project ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Projected {
    id: AnnotationId,
    label: String,
    #[serde(flatten)]
    bbox: PixelBox,
}

fn run_project(
    config: EditorConfig,
    records: &Path,
    page: PageRect,
    source: Option<Size>,
) -> Result<serde_json::Value> {
    let session = session_from(config, Some(records))?;
    let projected = session
        .store()
        .iter()
        .map(|rec| {
            let bbox = match source {
                Some(source) => source_to_target(&rec.bbox, source, page.size())?,
                None => to_pixels(&rec.bbox, &page),
            };
            Ok(Projected {
                id: rec.id,
                label: rec.label.clone(),
                bbox,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_value(projected)?)
}

// ─── replay ──────────────────────────────────────────────────────────────

/// One line of a replay script: an input event (`"type": ...`) or a host
/// action (`"action": ...`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Step {
    Input(InputEvent),
    Action(Action),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    SetContext {
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },
    ConfirmLabel {
        #[serde(default)]
        label: String,
    },
    SetPage {
        width: f64,
        height: f64,
    },
    ClearPage,
    AddDefault,
    Select {
        #[serde(default)]
        id: Option<String>,
    },
    SetProperties {
        values: BTreeMap<String, String>,
    },
    SetCategoryVisible {
        name: String,
        visible: bool,
    },
    Zoom {
        value: f64,
    },
}

fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::CategoryRequired => "category_required",
        Signal::LabelRequested => "label_requested",
        Signal::PageUnavailable => "page_unavailable",
    }
}

fn run_replay(
    config: EditorConfig,
    script: &Path,
    records: Option<&Path>,
    page: PageRect,
) -> Result<serde_json::Value> {
    let text =
        fs::read_to_string(script).with_context(|| format!("failed to read {}", script.display()))?;
    let steps: Vec<Step> =
        serde_json::from_str(&text).with_context(|| format!("invalid script {}", script.display()))?;

    let mut session = session_from(config, records)?;
    session.set_page(Some(page));
    let mut signals = Vec::new();

    for (n, step) in steps.into_iter().enumerate() {
        let outcome = match step {
            Step::Input(event) => session.handle_input(&event),
            Step::Action(action) => match action {
                Action::SetContext { category, label } => {
                    session.set_context(DrawContext { category, label });
                    continue;
                }
                Action::ConfirmLabel { label } => session.confirm_label(&label),
                Action::SetPage { width, height } => {
                    session.set_page(Some(PageRect::new(width, height)));
                    continue;
                }
                Action::ClearPage => {
                    session.set_page(None);
                    continue;
                }
                Action::AddDefault => {
                    session.add_default()?;
                    continue;
                }
                Action::Select { id } => {
                    session
                        .select(id.as_deref().map(AnnotationId::intern))
                        .with_context(|| format!("step {n}: select"))?;
                    continue;
                }
                Action::SetProperties { values } => {
                    let mut form = session
                        .properties()
                        .with_context(|| format!("step {n}: nothing selected"))?;
                    for (key, value) in values {
                        form.set(key, value);
                    }
                    session.save_properties(form)
                }
                Action::SetCategoryVisible { name, visible } => {
                    if !session.set_category_visible(&name, visible) {
                        log::warn!("step {n}: unknown category {name:?}");
                    }
                    continue;
                }
                Action::Zoom { value } => {
                    session.zoom_mut().set(value);
                    continue;
                }
            },
        };
        if let Some(signal) = outcome.signal {
            log::debug!("step {n}: {signal:?}");
            signals.push(signal_name(signal));
        }
    }

    Ok(serde_json::json!({
        "records": records_value(&session)?,
        "signals": signals,
        "selected": session.store().selected(),
    }))
}
