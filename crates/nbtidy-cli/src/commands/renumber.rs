use std::error::Error;

use clap::Args;
use nbtidy_core::renumber;

use crate::notebook::NotebookArgs;

#[derive(Args, Debug)]
pub struct RenumberArgs {
    #[command(flatten)]
    pub notebook: NotebookArgs,
    /// Don't print the rewritten counts to stderr.
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn run(args: &RenumberArgs) -> Result<(), Box<dyn Error>> {
    let target = args.notebook.output_target()?;
    let mut loaded = args.notebook.load()?;
    let changes = renumber(&mut loaded.document);
    if !args.quiet {
        for change in &changes {
            eprintln!("{change}");
        }
    }
    args.notebook
        .write(&loaded.document, &loaded.style, target.as_deref())?;
    Ok(())
}
