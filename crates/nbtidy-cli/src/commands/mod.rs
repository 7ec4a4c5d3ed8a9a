use clap::Args;
use nbtidy_core::CleanOptions;

pub mod cells;
pub mod clean;
pub mod fmt;
pub mod merge_outputs;
pub mod renumber;
pub mod run;

/// Identifier and tag handling shared by `clean` and `run`.
#[derive(Args, Debug, Clone)]
pub struct CleanFlags {
    /// Keep cell ids.
    #[arg(short = 'I', long)]
    pub keep_ids: bool,
    /// Ensure every cell's metadata has a `tags` key.
    #[arg(short = 'k', long, conflicts_with = "drop_empty_tags")]
    pub keep_tags: bool,
    /// Drop empty `tags` arrays.
    #[arg(short = 'K', long)]
    pub drop_empty_tags: bool,
}

impl CleanFlags {
    /// Builds cleaning options; `default_tags` applies when neither `-k` nor `-K` is given.
    pub fn options(&self, default_tags: Option<bool>) -> CleanOptions {
        let keep_tags = if self.keep_tags {
            Some(true)
        } else if self.drop_empty_tags {
            Some(false)
        } else {
            default_tags
        };
        CleanOptions {
            keep_ids: self.keep_ids,
            keep_tags,
        }
    }
}

/// Folds a `--x`/`--no-x` flag pair into a tri-state choice.
pub fn choice(keep: bool, drop: bool) -> Option<bool> {
    match (keep, drop) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}
