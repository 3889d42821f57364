//! Fleetgate CLI - Command-line interface for envelope processing and verification.

use clap::{Parser, Subcommand, ValueEnum};
use fleetgate_core::ContentClass;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::{canonicalize, index, process, verify_signature};

#[derive(Parser)]
#[command(name = "fleetgate")]
#[command(about = "Fleetgate telemetry envelope processing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClassArg {
    Connection,
    Attestation,
}

impl From<ClassArg> for ContentClass {
    fn from(value: ClassArg) -> Self {
        match value {
            ClassArg::Connection => ContentClass::Connection,
            ClassArg::Attestation => ContentClass::Attestation,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one message through the ingestion pipeline
    Process {
        /// Message payload file (or stdin if not provided)
        input: Option<String>,
        /// Transport-verified source identity
        #[arg(long)]
        source: String,
        /// Processing path
        #[arg(long, value_enum, default_value = "connection")]
        class: ClassArg,
        /// Identity to register the envelope decoder for (repeatable, default: the source)
        #[arg(long = "decoder")]
        decoders: Vec<String>,
        /// JSON options file
        #[arg(long)]
        config: Option<String>,
        /// JSON-RPC endpoint for contract signature checks
        #[arg(long)]
        rpc_url: Option<String>,
        /// Exit with error code if any envelope fails
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify an attestation signature
    VerifySignature {
        /// Claimed signer address
        #[arg(long)]
        signer: String,
        /// 0x-prefixed signature
        #[arg(long)]
        signature: String,
        /// Signed payload file (or stdin if neither this nor --hash is given)
        #[arg(long, conflicts_with = "hash")]
        payload: Option<String>,
        /// Precomputed 32-byte hash
        #[arg(long)]
        hash: Option<String>,
        /// JSON options file
        #[arg(long)]
        config: Option<String>,
        /// JSON-RPC endpoint for contract signature checks
        #[arg(long)]
        rpc_url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Encode or decode storage index keys
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },
    /// Canonicalize an envelope header
    Canonicalize {
        /// Input envelope JSON file (or stdin if not provided)
        input: Option<String>,
        /// Transport-verified source identity
        #[arg(long)]
        source: String,
        /// JSON options file
        #[arg(long)]
        config: Option<String>,
    },
}

#[derive(Subcommand)]
enum IndexCommands {
    /// Print the index key for a canonical envelope
    Encode {
        /// Input envelope JSON file (or stdin if not provided)
        input: Option<String>,
        /// Use the partial layout
        #[arg(long)]
        partial: bool,
    },
    /// Print the fields of an index key
    Decode {
        /// Index key
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            source,
            class,
            decoders,
            config,
            rpc_url,
            strict,
            json,
        } => process::run(process::ProcessArgs {
            input,
            source,
            class: class.into(),
            decoders,
            config,
            rpc_url,
            strict,
            json,
        }),
        Commands::VerifySignature {
            signer,
            signature,
            payload,
            hash,
            config,
            rpc_url,
            json,
        } => verify_signature::run(verify_signature::VerifyArgs {
            signer,
            signature,
            payload,
            hash,
            config,
            rpc_url,
            json,
        }),
        Commands::Index { command } => match command {
            IndexCommands::Encode { input, partial } => index::encode_key(input, partial),
            IndexCommands::Decode { key, json } => index::decode_key(key, json),
        },
        Commands::Canonicalize {
            input,
            source,
            config,
        } => canonicalize::run(input, source, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
