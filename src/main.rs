use std::path::{Path, PathBuf};

use anyhow::Result;
use audit_sampler::export;
use audit_sampler::sampling::{SampleSize, SamplingRule, Stratum};
use audit_sampler::{load_file, Dataset, LoadOptions, SamplingConfig, Session};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "audit-sampler", version, about = "Stratified sampling of financial records for audit review")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the row count and the detected type of every column
    Inspect(Input),
    /// Write a starter configuration for a dataset
    Template {
        #[command(flatten)]
        input: Input,
        /// Where to write the configuration
        #[arg(short, long)]
        output: PathBuf,
        /// Name stored in the configuration
        #[arg(long, default_value = "Sampling")]
        name: String,
    },
    /// Draw a stratified sample and export it
    Sample {
        #[command(flatten)]
        input: Input,
        /// Filter and rule configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
        /// Seed for random rules; overrides the one in the configuration
        #[arg(long)]
        seed: Option<u64>,
        /// Write all sampled rows to one CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write one CSV file per rule into this directory
        #[arg(long)]
        split_dir: Option<PathBuf>,
        /// Write the full result as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Input {
    /// Dataset file (.csv, .txt, .json, .parquet)
    file: PathBuf,
    /// CSV delimiter, a single character or `tab`
    #[arg(short, long, default_value = ";", value_parser = parse_delimiter)]
    delimiter: u8,
}

impl Input {
    fn load(&self) -> Result<Dataset> {
        load_file(
            &self.file,
            &LoadOptions {
                delimiter: self.delimiter,
            },
        )
    }
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("expected a single ASCII character, got '{s}'")),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Inspect(input) => inspect(&input),
        Command::Template {
            input,
            output,
            name,
        } => template(&input, &output, name),
        Command::Sample {
            input,
            config,
            seed,
            output,
            split_dir,
            json,
        } => {
            let dataset = input.load()?;
            let config = SamplingConfig::load(&config)?;
            let seed = seed.or(config.seed);

            let mut session = Session::new(dataset);
            let pruned = session.apply_config(config)?;
            if pruned.filters + pruned.rules > 0 {
                println!(
                    "Skipped {} filter(s) and {} rule(s) on columns missing from this file",
                    pruned.filters, pruned.rules
                );
            }

            let result = session.run(seed)?;
            print!("{}", export::render_summary(result));

            if let Some(path) = output {
                export::write_csv(result, &path, input.delimiter)?;
                println!("Wrote {}", path.display());
            }
            if let Some(dir) = split_dir {
                let files = export::write_csv_by_rule(result, &dir, input.delimiter)?;
                println!("Wrote {} file(s) to {}", files.len(), dir.display());
            }
            if let Some(path) = json {
                export::write_json(result, &path)?;
                println!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}

fn inspect(input: &Input) -> Result<()> {
    let dataset = input.load()?;
    println!("{}: {} rows", input.file.display(), dataset.len());
    for column in &dataset.columns {
        match dataset.unique_values.get(&column.name) {
            Some(values) => println!("  {:<24} {} ({} distinct)", column.name, column.kind, values.len()),
            None => println!("  {:<24} {}", column.name, column.kind),
        }
    }
    Ok(())
}

fn template(input: &Input, output: &Path, name: String) -> Result<()> {
    let dataset = input.load()?;
    let mut config = SamplingConfig::for_dataset(name, &dataset);
    config.rules.push(SamplingRule::new(
        "All records",
        Stratum::All,
        SampleSize::Count(5),
    ));
    config.save(output)?;
    println!("Wrote {}", output.display());
    Ok(())
}
