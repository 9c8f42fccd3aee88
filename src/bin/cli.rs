#![cfg(not(tarpaulin_include))]

use sheetlink::{Bounds, Workbook, a1_to_coordinates};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 || args.len() > 5 {
        eprintln!("Usage: {} <credentials.json> <url> [sheet] [A1:C10]", args[0]);
        return Ok(());
    }

    let workbook = Workbook::open(&args[2], args[1].as_str())?;

    let sheet = match args.get(3) {
        Some(name) => workbook.worksheet(name.as_str())?,
        None => workbook.active_worksheet()?,
    };

    let mut bounds = Bounds::all();
    if let Some(range) = args.get(4) {
        let (start, end) = range.split_once(':').unwrap_or((range.as_str(), range.as_str()));
        let (min_row, min_col) = a1_to_coordinates(start)?;
        let (max_row, max_col) = a1_to_coordinates(end)?;
        bounds = bounds.rows(min_row, max_row).cols(min_col, max_col);
    }

    println!("{}", sheet);
    for row in sheet.iter_rows(bounds)? {
        let line: Vec<String> = row.iter().map(|c| c.value().to_string()).collect();
        println!("{}", line.join("\t"));
    }

    Ok(())
}
