use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use brine_proto::decode_to_json;
use brine_proto_compiler::error::ProtoError;
use brine_proto_compiler::{compile_schema_to_rust, compile_schema_with, CodecConfig, CodecSet, SchemaSet};

#[derive(Parser)]
#[command(name = "bproto")]
#[command(about = "Validate Protocol Buffers schemas, inspect their codecs, generate Rust or decode messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with decode limits
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Largest message accepted by `decode`, in bytes
    #[arg(long, global = true)]
    max_message_size: Option<usize>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a JSON schema declaration, reporting every problem found
    Check {
        /// Input schema `.json` file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the generated encode/decode procedures as JSON
    Plan {
        /// Input schema `.json` file
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate Rust code from a schema, by calling `compile_schema_to_rust`
    GenRust {
        /// Input schema `.json` file
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.rs` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode an encoded message to JSON (printed to stdout)
    Decode {
        /// Schema `.json` file declaring the message
        #[arg(short, long)]
        schema: PathBuf,

        /// Fully-qualified message name, e.g. `acme.Person`
        #[arg(short, long)]
        message: String,

        /// File holding the encoded message
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();
}

fn load_config(cli: &Cli) -> Result<CodecConfig, ProtoError> {
    let mut config = match &cli.config {
        Some(path) => CodecConfig::load(path)?,
        None => CodecConfig::default(),
    };
    if let Some(max_message_size) = cli.max_message_size {
        config.limits.max_message_size = max_message_size;
    }
    Ok(config)
}

fn compile(input: &Path, config: &CodecConfig) -> Result<(SchemaSet, CodecSet), ProtoError> {
    let text = fs::read_to_string(input)?;
    compile_schema_with(&text, config)
}

fn write_output(output: Option<&PathBuf>, text: &str) -> Result<(), ProtoError> {
    match output {
        Some(out_path) => {
            fs::write(out_path, text)?;
            info!(path = %out_path.display(), "wrote output");
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn main() -> Result<(), ProtoError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Check { input } => {
            let (schema, codecs) = match compile(input, &config) {
                Err(ProtoError::Schema(errors)) => {
                    eprintln!("{}: {} problem(s)\n{}", input.display(), errors.len(), errors);
                    std::process::exit(1);
                }
                result => result?,
            };
            println!(
                "{}: ok ({} messages, {} enums, {} codecs)",
                input.display(),
                schema.messages.len(),
                schema.enums.len(),
                codecs.len()
            );
            Ok(())
        }

        Commands::Plan { input, output } => {
            let (_schema, codecs) = compile(input, &config)?;
            let json = serde_json::to_string_pretty(&codecs)?;
            write_output(output.as_ref(), &json)
        }

        Commands::GenRust { input, output } => {
            let (schema, codecs) = compile(input, &config)?;
            let rust_code = compile_schema_to_rust(&schema, &codecs);
            write_output(output.as_ref(), &rust_code)
        }

        Commands::Decode { schema, message, input } => {
            let (_schema, codecs) = compile(schema, &config)?;
            let data = fs::read(input)?;
            let json = decode_to_json(&codecs, message, &data)?;
            println!("{}", json);
            Ok(())
        }
    }
}
