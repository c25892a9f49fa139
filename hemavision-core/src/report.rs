use chrono::{DateTime, Local};
use hemavision_types::{format_percent, prelude::*};

/// Predictions below this confidence carry a manual-review warning.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.70;

pub const LOW_CONFIDENCE_WARNING: &str = "Low confidence prediction. Manual review recommended.";

#[bon::builder]
pub fn generate_report(
    probabilities: &Probabilities,
    filename: impl Into<String>,
    timestamp: Option<DateTime<Local>>,
) -> DiagnosticReport {
    let (predicted, confidence) = probabilities.top();
    let timestamp = timestamp.unwrap_or_else(Local::now);
    let warning = (confidence < LOW_CONFIDENCE_THRESHOLD).then(|| LOW_CONFIDENCE_WARNING.to_owned());
    if warning.is_some() {
        tracing::info!(%predicted, confidence, "low confidence prediction");
    }

    DiagnosticReport {
        timestamp: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        filename: filename.into(),
        predicted_cell_type: predicted,
        confidence: format_percent(confidence, 2),
        all_predictions: PercentageMap(*probabilities),
        cell_info: *predicted.info(),
        recommendation: format!(
            "Predicted: {predicted} with {} confidence",
            format_percent(confidence, 1)
        ),
        warning,
    }
}
