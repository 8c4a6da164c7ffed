//! Print a workbook sheet as tab-separated text, e.g. to inspect an exported result.

use anyhow::Result;
use clap::Parser;
use medpredict_lib::excel;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dump_excel", about = "Dump a worksheet as TSV")]
struct Args {
    path: PathBuf,
    /// Sheet to dump; the first sheet when omitted
    #[arg(long)]
    sheet: Option<String>,
    /// List sheet names instead of dumping
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.list {
        for name in excel::get_sheet_names(&args.path)? {
            println!("{}", name);
        }
        return Ok(());
    }
    let table = excel::read_log_table_from_path(&args.path, args.sheet.as_deref())?;
    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}
