use bedalloc::{
    Allocation, Moment, StatusCounts,
    hierarchy::{self, BlockNode, Rollup},
    status,
};
use clap::Parser;
use serde_json::{Value, json};
use tracing::instrument;

use super::{
    Context, OutputFormat,
    terminal::{Colorize, marker},
};

#[derive(Debug, Parser)]
#[command(about = "Show the location tree with rollup counts")]
pub struct Tree {
    /// Only show this location
    #[arg(long, short)]
    location: Option<String>,

    /// List every allocation under its block
    #[arg(long)]
    beds: bool,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Tree {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config()?;
        let snapshot = context.snapshot()?;
        let moment = context.moment(&config)?;
        let tree = snapshot.hierarchy();

        let locations: Vec<_> = tree
            .locations()
            .iter()
            .filter(|location| self.location.as_deref().is_none_or(|id| id == location.id()))
            .collect();

        if locations.is_empty() {
            match &self.location {
                Some(id) => anyhow::bail!("Location '{id}' not found"),
                None => println!("No placed allocations in the snapshot."),
            }
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => {
                let nodes: Vec<Value> = locations
                    .iter()
                    .map(|location| {
                        let tents: Vec<_> = location
                            .tents()
                            .iter()
                            .map(|tent| {
                                let blocks: Vec<_> = tent
                                    .blocks()
                                    .iter()
                                    .map(|block| self.block_json(block, &moment))
                                    .collect();
                                json!({
                                    "tent": tent.index(),
                                    "counts": hierarchy::status_counts(tent, &moment),
                                    "blocks": blocks,
                                })
                            })
                            .collect();
                        json!({
                            "location": location.id(),
                            "counts": hierarchy::status_counts(*location, &moment),
                            "tents": tents,
                        })
                    })
                    .collect();
                let output = json!({
                    "locations": nodes,
                    "dropped": tree.dropped().len(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                for location in locations {
                    println!(
                        "{} {}",
                        location.id(),
                        summary(&hierarchy::status_counts(location, &moment))
                    );
                    for tent in location.tents() {
                        println!(
                            "  tent {} {}",
                            tent.index(),
                            summary(&hierarchy::status_counts(tent, &moment))
                        );
                        for block in tent.blocks() {
                            self.print_block(block, &moment);
                        }
                    }
                }

                if !tree.dropped().is_empty() {
                    println!();
                    println!(
                        "{}",
                        format!("{} records left out of the tree", tree.dropped().len()).warning()
                    );
                }
            }
        }

        Ok(())
    }

    fn print_block(&self, block: &BlockNode<'_, Allocation>, moment: &Moment) {
        let strip: String = block
            .beds()
            .iter()
            .map(|&allocation| {
                let status = status::resolve(Some(allocation), moment);
                marker(status).status(status)
            })
            .collect();

        println!(
            "    block {} {} {strip}",
            block.index(),
            summary(&hierarchy::status_counts(block, moment))
        );

        if self.beds {
            for &allocation in block.beds() {
                let status = status::resolve(Some(allocation), moment);
                let bed = allocation
                    .bed_number()
                    .map_or_else(|| "?".to_string(), |n| n.to_string());
                println!(
                    "      bed {bed:>3} {} {} {}",
                    format!("{:<10}", status.to_string()).status(status),
                    allocation.id,
                    allocation.name.dim()
                );
            }
        }
    }

    fn block_json(&self, block: &BlockNode<'_, Allocation>, moment: &Moment) -> Value {
        let mut node = json!({
            "block": block.index(),
            "count": block.count(),
            "counts": hierarchy::status_counts(block, moment),
            "bed_numbers": block.bed_numbers(),
        });

        if self.beds {
            let beds: Vec<_> = block
                .beds()
                .iter()
                .map(|&allocation| {
                    json!({
                        "id": allocation.id,
                        "bed": allocation.bed_number(),
                        "status": status::resolve(Some(allocation), moment),
                    })
                })
                .collect();
            node["beds"] = Value::Array(beds);
        }

        node
    }
}

fn summary(counts: &StatusCounts) -> String {
    format!("({} items, {} occupied)", counts.total(), counts.occupied())
        .dim()
}
