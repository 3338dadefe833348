use bedalloc::{Batch, BedStatus, Moment, status};
use chrono::Duration;
use clap::Parser;
use serde_json::json;
use tracing::instrument;

use super::{
    Context, OutputFormat,
    terminal::{Colorize, is_narrow},
};

#[derive(Debug, Parser)]
#[command(about = "List reservation batches")]
pub struct Batches {
    /// Only list batches with at least one live reservation
    #[arg(long)]
    reserved: bool,

    /// List batches in snapshot order, overriding the configuration
    #[arg(long)]
    unsorted: bool,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Batches {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config()?;
        let snapshot = context.snapshot()?;
        let moment = context.moment(&config)?;

        let largest_first = config.largest_batches_first && !self.unsorted;
        let batches: Vec<_> = snapshot
            .batches(largest_first)
            .into_iter()
            .filter(|batch| !self.reserved || Self::is_live(batch, &moment))
            .collect();

        match self.output {
            OutputFormat::Json => Self::output_json(&batches, &moment)?,
            OutputFormat::Table => Self::output_table(&batches, &moment),
        }

        Ok(())
    }

    fn is_live(batch: &Batch<'_>, moment: &Moment) -> bool {
        batch
            .items()
            .iter()
            .any(|&item| status::resolve(Some(item), moment) == BedStatus::Reserved)
    }

    fn output_json(batches: &[Batch<'_>], moment: &Moment) -> anyhow::Result<()> {
        let output: Vec<_> = batches
            .iter()
            .map(|batch| {
                json!({
                    "key": batch.key().to_string(),
                    "batch_id": batch.batch_id(),
                    "size": batch.len(),
                    "ids": batch.ids().collect::<Vec<_>>(),
                    "phones": batch.phones(),
                    "contact_name": batch.contact_name(),
                    "expires_at": batch.expires_at(),
                    "remaining_seconds": batch.remaining(moment).as_ref().map(Duration::num_seconds),
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(batches: &[Batch<'_>], moment: &Moment) {
        if batches.is_empty() {
            println!("No batches found.");
            return;
        }

        // Pad before colouring; escape codes would count towards the width.
        let (label_width, expiry_width) = if is_narrow() { (0, 0) } else { (20, 24) };
        for batch in batches {
            let label = match batch.batch_id() {
                Some(id) => pad(id, label_width),
                None => pad("single", label_width).dim(),
            };
            let expiry = match (batch.expires_at(), batch.remaining(moment)) {
                (None, _) => pad("no expiry", expiry_width).dim(),
                (Some(_), Some(left)) => {
                    pad(&format!("expires in {}", humanize(left)), expiry_width).warning()
                }
                (Some(_), None) => pad("expired", expiry_width).dim(),
            };
            let phones: Vec<_> = batch.phones().iter().map(ToString::to_string).collect();

            if label_width == 0 {
                println!("{label} ({}) {expiry}", batch.len());
            } else {
                println!(
                    "{label} {:>3} beds  {expiry} {} {}",
                    batch.len(),
                    batch.contact_name().unwrap_or_default(),
                    phones.join(", ").dim()
                );
            }
        }

        println!();
        let beds: usize = batches.iter().map(Batch::len).sum();
        println!("{} batches, {beds} beds", batches.len());
    }
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

fn humanize(left: Duration) -> String {
    let minutes = left.num_minutes();
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else if minutes >= 1 {
        format!("{minutes}m")
    } else {
        format!("{}s", left.num_seconds())
    }
}
