use bedalloc::{BedCell, BedStatus, BlockPath, grid::BedGrid};
use clap::Parser;
use serde_json::json;
use tracing::instrument;

use super::{
    Context, OutputFormat, parse_block_path,
    terminal::{Colorize, marker, terminal_width},
};

/// Width of one rendered cell, including its trailing space.
const CELL_WIDTH: usize = 5;

#[derive(Debug, Parser)]
#[command(about = "Show the beds of one block")]
pub struct Grid {
    /// The block, written LOCATION/TENT/BLOCK
    #[clap(value_parser = parse_block_path)]
    block: BlockPath,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Grid {
    #[instrument(level = "debug", skip(context))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config()?;
        let snapshot = context.snapshot()?;
        let moment = context.moment(&config)?;

        let Some(grid) = snapshot.grid(&self.block, &moment) else {
            anyhow::bail!("No block metadata for {} in the snapshot", self.block);
        };

        match self.output {
            OutputFormat::Json => Self::output_json(&grid)?,
            OutputFormat::Table => self.output_table(&grid),
        }

        Ok(())
    }

    fn output_json(grid: &BedGrid<'_>) -> anyhow::Result<()> {
        let cells: Vec<_> = grid
            .cells()
            .iter()
            .map(|cell| {
                json!({
                    "bed": cell.bed_number,
                    "status": cell.status,
                    "allocation": cell.allocation.map(|a| &a.id),
                })
            })
            .collect();
        let strays: Vec<_> = grid.strays().iter().map(|a| &a.id).collect();

        let output = json!({
            "cells": cells,
            "counts": grid.counts(),
            "strays": strays,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(&self, grid: &BedGrid<'_>) {
        let counts = grid.counts();
        println!(
            "{} ({} beds, {} free)",
            self.block,
            counts.total(),
            counts.available.to_string().success()
        );

        let per_row = usize::from(terminal_width().unwrap_or(80)) / CELL_WIDTH;
        for row in grid.cells().chunks(per_row.max(1)) {
            let line: Vec<_> = row.iter().map(render).collect();
            println!("{}", line.join(" "));
        }

        println!();
        let legend: Vec<_> = BedStatus::ALL
            .iter()
            .map(|status| format!("{} {status}", marker(*status).status(*status)))
            .collect();
        println!("{}", legend.join("  ").dim());

        if !grid.strays().is_empty() {
            println!();
            println!(
                "{}",
                format!("{} allocations have no bed in this block:", grid.strays().len())
                    .warning()
            );
            for stray in grid.strays() {
                let bed = stray
                    .bed_number()
                    .map_or_else(|| "none".to_string(), |n| n.to_string());
                println!("  {} (bed {bed})", stray.id);
            }
        }
    }
}

fn render(cell: &BedCell<'_>) -> String {
    format!("{:>3}{}", cell.bed_number, marker(cell.status)).status(cell.status)
}
