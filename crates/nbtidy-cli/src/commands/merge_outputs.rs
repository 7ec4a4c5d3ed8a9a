use std::error::Error;

use clap::Args;
use nbtidy_core::merge_outputs;

use crate::notebook::NotebookArgs;

#[derive(Args, Debug)]
pub struct MergeOutputsArgs {
    #[command(flatten)]
    pub notebook: NotebookArgs,
}

pub fn run(args: &MergeOutputsArgs) -> Result<(), Box<dyn Error>> {
    let target = args.notebook.output_target()?;
    let mut loaded = args.notebook.load()?;
    let report = merge_outputs(&mut loaded.document);
    tracing::debug!(merged = report.merged, "merged stream outputs");
    args.notebook
        .write(&loaded.document, &loaded.style, target.as_deref())?;
    Ok(())
}
