use indicatif::ProgressStyle;

pub mod commands;

const PROGRESS_TEMPLATE: &str =
    "{elapsed_precise} {span_name} {span_fields} {bar:40.cyan/pink} {pos:>7}/{len:7} {msg}";

pub fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|err| {
            tracing::warn!(%err, "invalid progress template");
            ProgressStyle::default_bar()
        })
}
