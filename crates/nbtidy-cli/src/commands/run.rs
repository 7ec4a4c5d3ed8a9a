use std::error::Error;

use clap::Args;
use nbtidy_core::{
    parse_parameters, run_pipeline, Config, EngineOptions, ExecutionRequest, RunOptions,
};

use super::CleanFlags;
use crate::engine::ProcessEngine;
use crate::notebook::NotebookArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub notebook: NotebookArgs,
    #[command(flatten)]
    pub flags: CleanFlags,
    /// "<name>=<value>" parameter to set while executing the notebook.
    #[arg(short = 'p', long = "parameter", value_name = "NAME=VALUE")]
    pub parameters: Vec<String>,
    /// Ask the engine to save the notebook after each cell.
    #[arg(short = 's', long)]
    pub request_save_on_cell_execute: bool,
    /// How often, in seconds, the engine autosaves during long cells (0 disables).
    #[arg(short = 'S', long, value_name = "SECS")]
    pub autosave_cell_every: Option<u64>,
}

pub fn run(args: &RunArgs, config: &Config) -> Result<(), Box<dyn Error>> {
    let target = args.notebook.output_target()?;
    let parameters = parse_parameters(&args.parameters)?;
    let loaded = args.notebook.load()?;

    let engine = ProcessEngine::from_config(&config.engine);
    let request = ExecutionRequest {
        notebook_path: args.notebook.input_path(),
        document: &loaded.document,
        parameters: &parameters,
        options: EngineOptions {
            request_save_on_cell_execute: args.request_save_on_cell_execute.then_some(true),
            autosave_cell_every: args.autosave_cell_every,
        },
    };
    let opts = RunOptions::from_config(config, args.flags.options(None));

    let output = run_pipeline(&engine, &request, &opts)?;
    let (document, outcome) = output.into_parts();
    args.notebook.write(&document, &loaded.style, target.as_deref())?;
    outcome?;
    Ok(())
}
