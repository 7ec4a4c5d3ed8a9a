use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use nbtidy_core::{
    from_json_str, parse_cell_type, select_cells, to_json_string, CellProjection, CellSlice,
    JsonStyle, Projected,
};

use super::choice;
use crate::notebook::{read_text, write_stdout};

#[derive(Args, Debug)]
pub struct CellsArgs {
    /// Cell index (`3`, `-1`) or slice (`1:4`, `:2`, `-2:`).
    #[arg(value_name = "SLICE", allow_hyphen_values = true)]
    pub slice: String,
    /// Input notebook; stdin when absent or `-`.
    #[arg(value_name = "NB_PATH")]
    pub nb_path: Option<PathBuf>,
    /// Only cells of this type (`c`, `m`/`md`, `r` or the full name).
    #[arg(short = 't', long = "cell-type")]
    pub cell_type: Option<String>,
    /// Include each cell's source; alone, print the source as raw text.
    #[arg(short = 's', long = "source", overrides_with = "no_source")]
    pub source: bool,
    /// Exclude each cell's source.
    #[arg(short = 'S', long = "no-source")]
    pub no_source: bool,
    /// Include each cell's outputs; alone, print only the outputs.
    #[arg(short = 'o', long = "outputs", overrides_with = "no_outputs")]
    pub outputs: bool,
    /// Exclude each cell's outputs.
    #[arg(short = 'O', long = "no-outputs")]
    pub no_outputs: bool,
    /// Include each cell's metadata; alone, print only the metadata.
    #[arg(short = 'm', long = "metadata", overrides_with = "no_metadata")]
    pub metadata: bool,
    /// Exclude each cell's metadata.
    #[arg(short = 'M', long = "no-metadata")]
    pub no_metadata: bool,
}

pub fn run(args: &CellsArgs) -> Result<(), Box<dyn Error>> {
    let slice: CellSlice = args.slice.parse()?;
    let cell_type = args.cell_type.as_deref().map(parse_cell_type).transpose()?;
    let path = args.nb_path.as_deref().filter(|path| path.as_os_str() != "-");
    let document = from_json_str(&read_text(path)?)?;

    let selection = select_cells(&document.cells, cell_type, slice)?;
    let projection = CellProjection {
        metadata: choice(args.metadata, args.no_metadata),
        outputs: choice(args.outputs, args.no_outputs),
        source: choice(args.source, args.no_source),
    };
    match projection.project_selection(&selection)? {
        Projected::Source(text) => write_stdout(&format!("{text}\n"))?,
        Projected::Json(value) => {
            let style = JsonStyle {
                indent: Some(2),
                trailing_newline: true,
                ensure_ascii: false,
            };
            write_stdout(&to_json_string(&value, &style)?)?;
        }
    }
    Ok(())
}
