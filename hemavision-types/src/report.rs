use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    cell::{CellInfo, CellType},
    format_percent,
    probabilities::Probabilities,
};

/// Label to percentage string, e.g. `{"Eosinophils": "3.20%", ...}`, in label order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentageMap(pub Probabilities);

impl Serialize for PercentageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.scores().len()))?;
        for (cell, score) in self.0.iter() {
            map.serialize_entry(cell.as_ref(), &format_percent(score, 2))?;
        }
        map.end()
    }
}

/// Human-readable summary of one classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub timestamp: String,
    pub filename: String,
    pub predicted_cell_type: CellType,
    pub confidence: String,
    pub all_predictions: PercentageMap,
    pub cell_info: CellInfo,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
