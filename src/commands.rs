use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use clap::Args;
use hemavision_core::{
    Backend, ChartRenderer, HtmlExport, ModelSlot, Network, Pipeline, Preprocessor, Simulator,
    Typeface,
};
use hemavision_types::prelude::*;
use rayon::prelude::*;
use serde_json::{json, Value};
use strum::IntoEnumIterator;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::default_progress_style;

const DEFAULT_MODEL_PATH: &str = "models/hemavision.bin";

#[derive(Debug, Clone, Args)]
pub struct ClassifyArgs {
    /// Images to classify (png, jpg, jpeg).
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
    /// Weights written by `scaffold-model` or a training run.
    #[arg(long, env = "MODEL_PATH")]
    pub model: Option<PathBuf>,
    /// Simulate predictions from the filename instead of running a model. Takes precedence over `--model`.
    #[arg(long)]
    pub demo: bool,
    /// Also write a PNG and an interactive HTML chart per image here.
    #[arg(long)]
    pub chart_dir: Option<PathBuf>,
    #[arg(long, env = "CHART_FONT")]
    pub chart_font: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ScaffoldArgs {
    #[arg(long, short)]
    pub output: PathBuf,
    /// Hidden layer widths, in order. Repeat the flag for more layers.
    #[arg(long)]
    pub hidden: Vec<usize>,
}

pub fn build_pipeline(args: &ClassifyArgs) -> anyhow::Result<Pipeline> {
    let preprocessor = Preprocessor::default();
    let backend = if args.demo {
        tracing::warn!("demo mode: predictions are simulated and have no diagnostic value");
        Backend::Demo(Simulator)
    } else {
        let path = args
            .model
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        let slot = ModelSlot::new(path, preprocessor.feature_len());
        slot.warm()
            .with_context(|| format!("failed to load model {}", slot.path().display()))?;
        Backend::Model(Arc::new(slot))
    };
    let chart = ChartRenderer::builder()
        .typeface(Typeface::discover(args.chart_font.as_deref()))
        .build();
    Ok(Pipeline::builder()
        .backend(backend)
        .preprocessor(preprocessor)
        .chart(chart)
        .build())
}

/// Diagnoses one file, writing its charts to `chart_dir` when given.
pub fn classify_image(
    pipeline: &Pipeline,
    path: &Path,
    chart_dir: Option<&Path>,
) -> anyhow::Result<DiagnosticReport> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let diagnosis = pipeline
        .diagnose(&bytes, &name, &name)
        .with_context(|| format!("failed to classify {}", path.display()))?;

    if let Some(dir) = chart_dir {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chart".to_owned());
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let png = pipeline.chart().render_png(&diagnosis.probabilities)?;
        std::fs::write(dir.join(format!("{stem}.png")), png)?;
        HtmlExport::save(&diagnosis.probabilities, stem, dir)?;
    }
    Ok(diagnosis.report)
}

pub fn classify(args: ClassifyArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&args)?;

    let span = tracing::info_span!("classify");
    span.pb_set_style(&default_progress_style());
    span.pb_set_length(args.images.len() as u64);
    let _entered = span.enter();

    let results: Vec<_> = args
        .images
        .par_iter()
        .map(|path| {
            let result = classify_image(&pipeline, path, args.chart_dir.as_deref());
            span.pb_inc(1);
            (path, result)
        })
        .collect();

    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(report) => println!("{}", json!({ "image": path, "report": report })),
            Err(err) => {
                failures += 1;
                tracing::error!(image = %path.display(), "{err:#}");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} images failed", args.images.len());
    }
    Ok(())
}

/// Info for one cell type, or every cell type keyed by label.
pub fn cell_table(cell: Option<CellType>) -> Value {
    match cell {
        Some(cell) => json!(cell.info()),
        None => CellType::iter()
            .map(|cell| (cell.to_string(), json!(cell.info())))
            .collect::<serde_json::Map<_, _>>()
            .into(),
    }
}

pub fn scaffold_model(args: ScaffoldArgs) -> anyhow::Result<()> {
    let input_size = (IMAGE_SIZE * IMAGE_SIZE * 3) as usize;
    let network = Network::untrained()
        .input_size(input_size)
        .hidden(args.hidden.as_slice())
        .call();
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    network
        .save_data(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), ?network, "wrote untrained model");
    Ok(())
}
