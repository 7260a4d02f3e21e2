//! PDF Form Fill CLI tool
//!
//! Copies a PDF and fills its first-page form fields from a JSON options string.

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pdf_form_fill::process;

const USAGE: &str = "Usage: pdf-form-fill '<json_string>'";

/// PDF Form Fill - Copy a PDF and fill its form fields
#[derive(Parser)]
#[command(name = "pdf-form-fill")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Fill the Name field of a character sheet
    pdf-form-fill '{\"input_path\": \"sheet.pdf\", \"output_path\": \"alice.pdf\", \"metadata\": {\"Name\": \"Alice\"}}'

    # Show what happened on stderr
    RUST_LOG=info pdf-form-fill '{\"input_path\": \"sheet.pdf\", \"output_path\": \"out.pdf\", \"metadata\": {}}'")]
struct Cli {
    /// JSON object with input_path, output_path and metadata
    #[arg(allow_hyphen_values = true)]
    options_json: String,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                println!("{}", USAGE);
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = init_logging() {
        eprintln!("Warning: {}", e);
    }

    // Failures are reported on stdout; the exit status stays 0 either way
    process(&cli.options_json);
}

/// Log to stderr so stdout only carries the usage and error lines
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
