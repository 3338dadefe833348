use std::process;

use bedalloc::{BlockPath, CalendarDate, Gender, Phone, ReservationRequest};
use clap::Parser;
use serde_json::json;
use tracing::instrument;

use super::{Context, OutputFormat, parse_block_path, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Check a reservation request before submitting it")]
pub struct Check {
    /// The block, written LOCATION/TENT/BLOCK
    #[clap(value_parser = parse_block_path)]
    block: BlockPath,

    /// The bed to reserve
    #[arg(long)]
    bed: u32,

    /// Guest name
    #[arg(long)]
    name: String,

    /// Guest phone (10 digits)
    #[arg(long)]
    phone: String,

    /// Emergency contact phone (10 digits)
    #[arg(long)]
    emergency_phone: Option<String>,

    /// Guest gender (male, female, other)
    #[arg(long)]
    gender: Gender,

    /// First day of the stay (YYYY-MM-DD)
    #[arg(long)]
    start: CalendarDate,

    /// Last day of the stay (YYYY-MM-DD)
    #[arg(long)]
    end: CalendarDate,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Check {
    #[instrument(level = "debug", skip_all, fields(block = %self.block, bed = self.bed))]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config()?;
        let snapshot = context.snapshot()?;
        let moment = context.moment(&config)?;

        let Some(block) = snapshot.block(&self.block) else {
            anyhow::bail!("No block metadata for {} in the snapshot", self.block);
        };

        let request = ReservationRequest {
            name: self.name,
            phone: Phone::new(self.phone),
            emergency_phone: self.emergency_phone.map(Phone::new),
            gender: self.gender,
            start_date: self.start,
            end_date: self.end,
            bed_number: self.bed,
        };

        let problems: Vec<String> = match request.validate(block, snapshot.in_block(&self.block), &moment)
        {
            Ok(()) => Vec::new(),
            Err(errors) => errors.errors().iter().map(ToString::to_string).collect(),
        };

        match self.output {
            OutputFormat::Json => {
                let output = json!({
                    "block": self.block.to_string(),
                    "bed": request.bed_number,
                    "ok": problems.is_empty(),
                    "problems": problems,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table if problems.is_empty() => {
                println!(
                    "{}",
                    format!("✅ Bed {} in {} can be reserved", request.bed_number, self.block)
                        .success()
                );
                println!(
                    "{}",
                    "The backend checks again when the reservation is submitted.".dim()
                );
            }
            OutputFormat::Table => {
                eprintln!(
                    "{}",
                    format!("⚠️  Bed {} in {} cannot be reserved:", request.bed_number, self.block)
                        .warning()
                );
                for problem in &problems {
                    eprintln!("  • {problem}");
                }
            }
        }

        if !problems.is_empty() {
            process::exit(1);
        }

        Ok(())
    }
}
