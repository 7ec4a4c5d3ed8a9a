use std::error::Error;

use clap::Args;
use nbtidy_core::{filter_document, FieldSelection};

use super::choice;
use crate::notebook::NotebookArgs;

/// Lowercase flags keep only the named fields; uppercase flags drop them.
#[derive(Args, Debug)]
pub struct FmtArgs {
    #[command(flatten)]
    pub notebook: NotebookArgs,
    /// Keep only cell sources.
    #[arg(short = 's', long = "sources", overrides_with = "no_sources")]
    pub sources: bool,
    /// Drop cell sources.
    #[arg(short = 'S', long = "no-sources")]
    pub no_sources: bool,
    /// Keep only cell outputs.
    #[arg(long = "outputs", overrides_with = "no_outputs")]
    pub outputs: bool,
    /// Drop cell outputs.
    #[arg(long = "no-outputs")]
    pub no_outputs: bool,
    /// Keep only cell metadata.
    #[arg(short = 'm', long = "cell-metadata", overrides_with = "no_cell_metadata")]
    pub cell_metadata: bool,
    /// Drop cell metadata.
    #[arg(short = 'M', long = "no-cell-metadata")]
    pub no_cell_metadata: bool,
    /// Keep only execution counts.
    #[arg(short = 'c', long = "execution-count", overrides_with = "no_execution_count")]
    pub execution_count: bool,
    /// Drop execution counts.
    #[arg(short = 'C', long = "no-execution-count")]
    pub no_execution_count: bool,
    /// Keep only cell ids.
    #[arg(short = 'I', long = "cell-id", overrides_with = "no_cell_id")]
    pub cell_id: bool,
    /// Drop cell ids.
    #[arg(short = 'D', long = "no-cell-id")]
    pub no_cell_id: bool,
    /// Keep only cell attachments.
    #[arg(long = "attachments", overrides_with = "no_attachments")]
    pub attachments: bool,
    /// Drop cell attachments.
    #[arg(long = "no-attachments")]
    pub no_attachments: bool,
    /// Keep only notebook metadata.
    #[arg(short = 'b', long = "nb-metadata", overrides_with = "no_nb_metadata")]
    pub nb_metadata: bool,
    /// Drop notebook metadata.
    #[arg(short = 'B', long = "no-nb-metadata")]
    pub no_nb_metadata: bool,
}

impl FmtArgs {
    fn selection(&self) -> FieldSelection {
        FieldSelection {
            source: choice(self.sources, self.no_sources),
            outputs: choice(self.outputs, self.no_outputs),
            attachments: choice(self.attachments, self.no_attachments),
            document_metadata: choice(self.nb_metadata, self.no_nb_metadata),
            cell_metadata: choice(self.cell_metadata, self.no_cell_metadata),
            execution_count: choice(self.execution_count, self.no_execution_count),
            cell_id: choice(self.cell_id, self.no_cell_id),
        }
    }
}

pub fn run(args: &FmtArgs) -> Result<(), Box<dyn Error>> {
    let target = args.notebook.output_target()?;
    let loaded = args.notebook.load()?;
    let filter = args.selection().resolve();
    let value = filter_document(&loaded.document, &filter)?;
    args.notebook.write(&value, &loaded.style, target.as_deref())?;
    Ok(())
}
