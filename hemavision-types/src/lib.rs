pub mod cell;
pub mod prelude;
pub mod probabilities;
pub mod report;
pub mod tensor;

/// Formats a unit-interval score as a percentage with `decimals` digits, `0.8712 -> "87.12%"`.
pub fn format_percent(value: f32, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}
