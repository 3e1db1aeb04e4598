//! Product Importer CLI - Transform flat product CSVs into nested JSON
//!
//! ```bash
//! product-importer run products.csv -c products.json   # Full pipeline from a config
//! product-importer parse products.csv                  # Just parse CSV to JSON
//! product-importer group products.csv --by PLU         # Parse and group
//! product-importer example-config                      # Show an example config
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use product_importer::logs::{log_error, log_info_indent, log_success, log_warning};
use product_importer::{
    example_config, parse_file, Importer, OutputFormat, ParseOptions, PipelineConfig,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Fallback config path when `--config` is not given
const CONFIG_ENV: &str = "PRODUCT_IMPORTER_CONFIG";

#[derive(Parser)]
#[command(name = "product-importer")]
#[command(about = "Group, sort and reshape flat product CSV files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output its records as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a CSV file and group its records by one field
    Group {
        /// Input CSV file
        input: PathBuf,

        /// Field to group by
        #[arg(short, long)]
        by: String,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full pipeline described by a config file
    Run {
        /// Input CSV file
        input: PathBuf,

        /// Pipeline config (JSON); falls back to $PRODUCT_IMPORTER_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Which part of the result to output
        #[arg(short, long, value_enum, default_value = "all")]
        select: Select,

        /// Output format: json, json-pretty or plain (default: from config)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show an example pipeline config
    ExampleConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Select {
    All,
    First,
    Last,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Group {
            input,
            by,
            delimiter,
            output,
        } => cmd_group(&input, &by, delimiter, output.as_deref()),

        Commands::Run {
            input,
            config,
            select,
            format,
            output,
        } => cmd_run(&input, config, select, format.as_deref(), output.as_deref()),

        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ParseOptions::default().with_delimiter(delimiter);
    let result = parse_file(input, &options)?;

    log_info_indent(format!("Encoding: {}", result.encoding), 1);
    log_info_indent(
        format!(
            "Delimiter: '{}'{}",
            format_delimiter(result.delimiter),
            if delimiter.is_none() { " (auto-detected)" } else { "" }
        ),
        1,
    );
    log_info_indent(format!("Columns: {}", result.headers.join(", ")), 1);
    log_success(format!("Parsed {} records", result.records.len()));

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)
}

fn cmd_group(
    input: &Path,
    field: &str,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ParseOptions::default().with_delimiter(delimiter);
    let mut importer = Importer::from_path_with(input, &options)?;
    importer.group_by(field)?;

    let json = importer.get(OutputFormat::JsonPretty)?;
    write_output(&json.to_string(), output)
}

fn cmd_run(
    input: &Path,
    config: Option<PathBuf>,
    select: Select,
    format: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .ok_or_else(|| format!("No config given (use --config or set {})", CONFIG_ENV))?;

    let config = PipelineConfig::from_file(&config_path)?;
    let format: OutputFormat = match format {
        Some(name) => name.parse()?,
        None => config.format,
    };

    let mut importer = Importer::from_path_with(input, &config.parse_options())?;
    if let Err(missing) = config.validate_headers(importer.headers()) {
        log_warning(format!("Columns missing from input: {}", missing.join(", ")));
    }
    config.apply(&mut importer)?;

    let rendered = match select {
        Select::All => importer.get(format)?,
        Select::First => importer.first(format)?,
        Select::Last => importer.last(format)?,
    };

    write_output(&rendered.to_string(), output)
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_config().to_json()?);
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            log_success(format!("Output written to: {}", p.display()));
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
