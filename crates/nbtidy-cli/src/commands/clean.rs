use std::error::Error;

use clap::Args;
use nbtidy_core::clean_document;

use super::CleanFlags;
use crate::notebook::NotebookArgs;

#[derive(Args, Debug)]
pub struct CleanArgs {
    #[command(flatten)]
    pub notebook: NotebookArgs,
    #[command(flatten)]
    pub flags: CleanFlags,
}

pub fn run(args: &CleanArgs) -> Result<(), Box<dyn Error>> {
    let target = args.notebook.output_target()?;
    let mut loaded = args.notebook.load()?;
    // No pre-execution document to align against: empty tags go unless -k.
    let opts = args.flags.options(Some(false));
    clean_document(&mut loaded.document, &opts);
    args.notebook
        .write(&loaded.document, &loaded.style, target.as_deref())?;
    Ok(())
}
