//! Process command implementation.

use fleetgate_canonical::Canonicalizer;
use fleetgate_core::{
    CloudEventDecoder, ContentClass, DecoderRegistry, InboundMessage, Pipeline, SignatureVerifier,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::commands::read_input;
use crate::config::{chain_client, load_options};
use crate::output::{envelope_json, format_json, format_table_row, print_table_header};

pub struct ProcessArgs {
    pub input: Option<String>,
    pub source: String,
    pub class: ContentClass,
    pub decoders: Vec<String>,
    pub config: Option<String>,
    pub rpc_url: Option<String>,
    pub strict: bool,
    pub json: bool,
}

pub fn run(args: ProcessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let payload = read_input(args.input.as_deref())?;
    let options = load_options(args.config.as_deref())?;

    let mut registry = DecoderRegistry::new();
    if args.decoders.is_empty() {
        registry.register(args.source.clone(), Arc::new(CloudEventDecoder));
    }
    for identity in &args.decoders {
        registry.register(identity.clone(), Arc::new(CloudEventDecoder));
    }

    let verifier = SignatureVerifier::new(
        chain_client(args.rpc_url.as_deref(), &options)?,
        options.rpc_timeout(),
    );
    let canonicalizer = Canonicalizer::new(options.canonicalizer_options());
    let pipeline = Pipeline::new(registry, canonicalizer, verifier, options);

    let msg = InboundMessage {
        payload,
        source_identity: args.source,
        class: args.class,
    };
    let runtime = tokio::runtime::Runtime::new()?;
    let results = runtime.block_on(pipeline.process(msg));

    let mut failures = 0usize;
    let mut processed = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(envelope) => processed.push(envelope),
            Err(failure) => {
                failures += 1;
                failed.push(failure.record());
            }
        }
    }

    if args.json {
        let envelopes = processed
            .iter()
            .map(|p| -> Result<Value, serde_json::Error> {
                Ok(json!({
                    "metadata": p.metadata,
                    "envelope": envelope_json(&p.envelope)?,
                    "signals": p.signals,
                    "diagnostics": p.diagnostics,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let report = json!({ "processed": envelopes, "failed": failed });
        println!("{}", format_json(&report));
    } else {
        print_table_header();
        for p in &processed {
            println!("{}", format_table_row(&p.metadata));
            for diagnostic in &p.diagnostics {
                println!("  ! {}", diagnostic);
            }
        }
        for f in &failed {
            eprintln!("FAILED [{}]: {}", f.processor, f.cause);
        }
        println!();
        println!("Processed: {}, failed: {}", processed.len(), failures);
    }

    if args.strict && failures > 0 {
        return Err(format!("{} envelope(s) failed", failures).into());
    }
    Ok(())
}
