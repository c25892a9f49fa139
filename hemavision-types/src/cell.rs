use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoStaticStr, VariantArray};

/// White blood cell categories the classifier distinguishes.
///
/// Declaration order is the model's output index order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    IntoStaticStr,
    EnumString,
    EnumIter,
    EnumCount,
    VariantArray,
)]
pub enum CellType {
    Eosinophils,
    Lymphocytes,
    Monocytes,
    Neutrophils,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellInfo {
    pub description: &'static str,
    pub morphology: &'static str,
    pub normal_range: &'static str,
    pub function: &'static str,
}

static CELL_INFO: [CellInfo; CellType::COUNT] = [
    CellInfo {
        description:
            "Eosinophils are white blood cells that fight parasitic infections and allergic reactions.",
        morphology: "Bilobed nucleus, abundant pink/red granules in cytoplasm",
        normal_range: "1-4% of white blood cells",
        function: "Defense against parasites and allergies",
    },
    CellInfo {
        description: "Lymphocytes are crucial for adaptive immunity and antibody production.",
        morphology: "Small cell, large nucleus, scanty cytoplasm",
        normal_range: "20-40% of white blood cells",
        function: "Immune response and antibody production",
    },
    CellInfo {
        description: "Monocytes develop into macrophages to clear infections.",
        morphology: "Largest WBC, kidney-shaped nucleus, abundant gray cytoplasm",
        normal_range: "2-8% of white blood cells",
        function: "Phagocytosis and antigen presentation",
    },
    CellInfo {
        description:
            "Neutrophils are the most abundant white blood cells and first responders to infection.",
        morphology: "Multi-lobed nucleus, fine granules, pale cytoplasm",
        normal_range: "40-60% of white blood cells",
        function: "Combat bacterial infections",
    },
];

impl CellType {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::VARIANTS.get(index).copied()
    }

    pub fn info(self) -> &'static CellInfo {
        &CELL_INFO[self.index()]
    }
}
