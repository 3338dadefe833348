use bedalloc::{BedStatus, StatusCounts, hierarchy};
use clap::Parser;
use tracing::instrument;

use super::{
    Context, OutputFormat,
    terminal::{Colorize, is_narrow},
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show allocation and bed counts by status")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

struct Summary {
    today: String,
    locations: Vec<(String, StatusCounts)>,
    allocations: StatusCounts,
    beds: Option<StatusCounts>,
    dropped: usize,
}

impl Status {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config()?;
        let snapshot = context.snapshot()?;
        let moment = context.moment(&config)?;

        if snapshot.allocations().is_empty() && snapshot.blocks().is_empty() {
            println!("No allocations found in the snapshot.");
            return Ok(());
        }

        let tree = snapshot.hierarchy();
        let locations: Vec<_> = tree
            .locations()
            .iter()
            .map(|location| {
                (
                    location.id().to_string(),
                    hierarchy::status_counts(location, &moment),
                )
            })
            .collect();

        // Empty beds only show up when block metadata is present.
        let beds: Option<StatusCounts> = (!snapshot.blocks().is_empty()).then(|| {
            snapshot
                .blocks()
                .iter()
                .filter_map(|block| snapshot.grid(&block.path, &moment))
                .map(|grid| grid.counts())
                .sum()
        });

        let summary = Summary {
            today: moment.today().to_string(),
            locations,
            allocations: StatusCounts::of(snapshot.allocations(), &moment),
            beds,
            dropped: tree.dropped().len(),
        };

        match self.output {
            OutputFormat::Json => Self::output_json(&summary)?,
            OutputFormat::Table if self.quiet => Self::output_quiet(&summary),
            OutputFormat::Table => Self::output_table(&summary),
        }

        Ok(())
    }

    fn output_json(summary: &Summary) -> anyhow::Result<()> {
        use serde_json::json;

        let locations: Vec<_> = summary
            .locations
            .iter()
            .map(|(id, counts)| json!({ "location": id, "counts": counts }))
            .collect();

        let output = json!({
            "today": summary.today,
            "locations": locations,
            "allocations": summary.allocations,
            "beds": summary.beds,
            "dropped": summary.dropped,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(summary: &Summary) {
        let counts = summary.beds.unwrap_or(summary.allocations);
        println!(
            "available={} reserved={} current={} future={} dropped={}",
            counts.available, counts.reserved, counts.current, counts.future, summary.dropped
        );
    }

    fn output_table(summary: &Summary) {
        println!("Allocations as of {}", summary.today);
        println!("{}", "──────────────────────────".dim());

        if is_narrow() {
            for (id, counts) in &summary.locations {
                println!("{id}: {}", Self::inline(counts));
            }
            println!("Total: {}", Self::inline(&summary.allocations));
        } else {
            println!(
                "{:<16} {:>9} {:>9} {:>9} {:>9}",
                "Location", "Available", "Reserved", "Current", "Future"
            );
            for (id, counts) in &summary.locations {
                Self::row(id, counts);
            }
            Self::row("Total", &summary.allocations);
        }

        if let Some(beds) = &summary.beds {
            println!();
            println!("Beds: {} of {} free", beds.available.to_string().success(), beds.total());
            for status in BedStatus::ALL {
                println!(
                    "  {} {}",
                    format!("{:<10}", status.to_string()).status(status),
                    beds.get(status)
                );
            }
        }

        if summary.dropped > 0 {
            println!();
            println!(
                "Dropped records: {} ⚠️",
                summary.dropped.to_string().warning()
            );
            println!(
                "{}",
                "Records without a full block path are left out of the tree. Run with -vv to list them."
                    .dim()
            );
        }
    }

    fn row(label: &str, counts: &StatusCounts) {
        println!(
            "{label:<16} {:>9} {:>9} {:>9} {:>9}",
            counts.available, counts.reserved, counts.current, counts.future
        );
    }

    fn inline(counts: &StatusCounts) -> String {
        BedStatus::ALL
            .iter()
            .map(|status| format!("{} {}", counts.get(*status), status))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
