use std::path::Path;

use charming::{
    component::{Axis, Title},
    element::{AxisType, Label, LabelPosition, Tooltip, Trigger},
    series::Bar,
    Chart, HtmlRenderer,
};
use hemavision_types::prelude::*;
use thiserror::Error;

use super::CHART_TITLE;

#[derive(Debug, Error)]
pub enum HtmlExportError {
    #[error("failed to create chart directory")]
    Io(#[from] std::io::Error),
    #[error("failed to save chart: {0}")]
    Render(String),
}

/// Interactive counterpart of the PNG chart, written as a standalone ECharts page.
pub struct HtmlExport;

impl HtmlExport {
    pub fn chart(probabilities: &Probabilities) -> Chart {
        let (labels, scores): (Vec<String>, Vec<f64>) = probabilities
            .iter()
            .map(|(cell, score)| (cell.to_string(), (f64::from(score) * 1000.0).round() / 1000.0))
            .unzip();
        Chart::new()
            .title(Title::new().text(CHART_TITLE).left("center"))
            .tooltip(Tooltip::new().trigger(Trigger::Axis))
            .x_axis(Axis::new().type_(AxisType::Category).data(labels))
            .y_axis(
                Axis::new()
                    .type_(AxisType::Value)
                    .name("Confidence")
                    .min(0.0)
                    .max(1.0),
            )
            .series(
                Bar::new()
                    .name("confidence")
                    .label(Label::new().show(true).position(LabelPosition::Top))
                    .data(scores),
            )
    }

    pub fn save(
        probabilities: &Probabilities,
        label: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<std::path::PathBuf, HtmlExportError> {
        let chart = Self::chart(probabilities);
        let mut renderer = HtmlRenderer::new(CHART_TITLE, 800, 600);
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let file = path.join(label.into() + ".html");
        renderer
            .save(&chart, &file)
            .map_err(|err| HtmlExportError::Render(format!("{err:?}")))?;
        Ok(file)
    }
}
