//! Converts a JSON document to its VPack representation.

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::sync::Arc;
use vpack::{visit_recursive, AttributeTranslator, Options, Parser, TraversalOrder};

#[derive(ClapParser)]
#[command(name = "json-to-vpack")]
#[command(version)]
#[command(about = "Reads a JSON INFILE and saves its VPack representation in OUTFILE")]
struct Args {
    /// Store array and object types without index tables (default).
    #[arg(long, overrides_with = "no_compact")]
    compact: bool,
    /// Store array and object types with index tables.
    #[arg(long)]
    no_compact: bool,
    /// Compress object keys occurring more than once.
    #[arg(long, overrides_with = "no_compress")]
    compress: bool,
    /// Store object keys uncompressed (default).
    #[arg(long)]
    no_compress: bool,
    /// Input file; "-" reads standard input.
    infile: String,
    /// Output file; standard output when omitted.
    outfile: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let compact = !args.no_compact;
    let compress = args.compress && !args.no_compress;

    let input = read_input(&args.infile)?;

    let mut options = Options {
        build_unindexed_arrays: compact,
        build_unindexed_objects: compact,
        ..Options::default()
    };

    if compress {
        if let Some(translator) = build_compressed_keys(&input) {
            options.attribute_translator = Some(Arc::new(translator));
        }
    }

    let builder = Parser::with_options(options)
        .parse(&input)
        .with_context(|| format!("cannot parse infile '{}'", args.infile))?;
    let buffer = builder.into_buffer()?;

    write_output(args.outfile.as_deref(), buffer.data())?;

    eprintln!("Successfully converted JSON infile '{}'", args.infile);
    eprintln!("JSON Infile size:   {}", input.len());
    eprintln!("VPack Outfile size: {}", buffer.len());
    Ok(())
}

fn read_input(infile: &str) -> Result<Vec<u8>> {
    if infile == "-" {
        let mut input = Vec::new();
        io::stdin()
            .read_to_end(&mut input)
            .context("cannot read standard input")?;
        Ok(input)
    } else {
        fs::read(infile).with_context(|| format!("cannot read infile '{}'", infile))
    }
}

fn write_output(outfile: Option<&str>, bytes: &[u8]) -> Result<()> {
    match outfile {
        Some(path) => fs::write(path, bytes).with_context(|| format!("cannot write outfile '{}'", path)),
        None => io::stdout()
            .write_all(bytes)
            .context("cannot write to standard output"),
    }
}

/// Counts string keys in a first parse and assigns compact ids to the
/// ones worth compressing: keys occurring at least twice whose length
/// is at least 2 bytes (3 once 255 ids are taken, where the id itself
/// grows). Returns `None` when the prescan fails or nothing
/// qualifies; conversion then proceeds uncompressed.
fn build_compressed_keys(input: &[u8]) -> Option<AttributeTranslator> {
    let builder = Parser::new().parse(input).ok()?;
    let slice = builder.slice().ok()?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    visit_recursive(slice, TraversalOrder::PreOrder, &mut |key, _| {
        if key.is_string().unwrap_or(false) {
            if let Ok(name) = key.get_string() {
                match counts.get_mut(name) {
                    Some(count) => *count += 1,
                    None => {
                        counts.insert(name.to_string(), 1);
                        order.push(name.to_string());
                    }
                }
            }
        }
        true
    })
    .ok()?;

    let mut translator = AttributeTranslator::new();
    let mut required_length = 2;
    let mut next_id = 0u64;
    let mut compressed = 0usize;
    let mut stats: Vec<(u64, &str, usize)> = Vec::new();
    for name in &order {
        let count = counts[name.as_str()];
        if count > 1 && name.len() >= required_length {
            next_id += 1;
            translator.add(name, next_id);
            stats.push((next_id, name.as_str(), count));
            if translator.count() == 255 {
                required_length = 3;
            }
            compressed += count;
        }
    }
    if next_id == 0 {
        return None;
    }
    translator.seal();

    eprintln!("{} occurrences of object keys will be stored compressed:", compressed);
    for (printed, (id, name, count)) in stats.iter().enumerate() {
        if printed == 20 {
            eprintln!(" - ... {} object key(s) follow ...", stats.len() - printed);
            break;
        }
        eprintln!(" - #{}: {} ({} occurrences)", id, name, count);
    }
    Some(translator)
}
