use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use std::process;
use syn_vm::{Listing, Machine, Snapshot};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod format;

/// 0 = OK, 1 = other, 2 = input error (unreadable or malformed file).
const EXIT_OTHER: i32 = 1;
const EXIT_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "syn_vm_disasm", version, about = "syn-vm image and save-state inspector")]
struct Cli {
    /// Treat images as comma-separated decimal text instead of raw words
    #[arg(long, global = true, env = "SYN_VM_TEXT_IMAGE")]
    text: bool,

    /// Emit JSON instead of a listing
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Disassemble a program image
    Dump {
        /// Program image path
        #[arg(env = "SYN_VM_IMAGE")]
        image: String,
        /// First address to decode
        #[arg(long, default_value_t = 0)]
        from: u16,
        /// Stop after this many listing lines
        #[arg(long)]
        count: Option<usize>,
    },
    /// Decode the single instruction at an address
    Decode {
        #[arg(env = "SYN_VM_IMAGE")]
        image: String,
        addr: u16,
    },
    /// Summarize a save state, optionally disassembling around its pc
    Save {
        /// Save-state archive path
        save: String,
        /// Program image the save was taken against
        #[arg(long, env = "SYN_VM_IMAGE")]
        image: Option<String>,
        /// Instructions to show from the saved pc (needs --image)
        #[arg(long, default_value_t = 8)]
        window: usize,
    },
}

#[derive(Debug)]
enum CliError {
    Input(anyhow::Error),
    Other(anyhow::Error),
}

impl CliError {
    fn code(&self) -> i32 {
        match self {
            CliError::Input(_) => EXIT_INPUT,
            CliError::Other(_) => EXIT_OTHER,
        }
    }

    fn error(&self) -> &anyhow::Error {
        match self {
            CliError::Input(e) | CliError::Other(e) => e,
        }
    }
}

fn load(path: &str, text: bool) -> Result<Machine, CliError> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read {path}"))
        .map_err(CliError::Input)?;
    let mut machine = Machine::new();
    let loaded = if text {
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{path} is not utf-8 text"))
            .map_err(CliError::Input)?;
        machine.load_text(&text)
    } else {
        machine.load_bytes(&bytes)
    };
    loaded
        .with_context(|| format!("parse {path}"))
        .map_err(CliError::Input)?;
    info!(path, words = machine.memory().len(), "image loaded");
    Ok(machine)
}

fn dump(cli: &Cli, image: &str, from: u16, count: Option<usize>) -> Result<(), CliError> {
    let machine = load(image, cli.text)?;
    let listing: Vec<Listing> = syn_vm::Disassembly::new(machine.memory(), from)
        .take(count.unwrap_or(usize::MAX))
        .collect();
    debug!(lines = listing.len(), "disassembled");
    if cli.json {
        let items: Vec<_> = listing.iter().map(format::listing_json).collect();
        println!("{}", serde_json::to_string_pretty(&items).map_err(|e| CliError::Other(e.into()))?);
    } else {
        for line in &listing {
            println!("{}", format::listing_line(line));
        }
    }
    Ok(())
}

fn decode_one(cli: &Cli, image: &str, addr: u16) -> Result<(), CliError> {
    let machine = load(image, cli.text)?;
    let decoded = machine
        .decode_at(addr)
        .with_context(|| format!("decode at {addr}"))
        .map_err(CliError::Input)?;
    if cli.json {
        println!("{}", format::listing_json(&Listing::Instruction(decoded)));
    } else {
        println!("{}", format::listing_line(&Listing::Instruction(decoded)));
    }
    Ok(())
}

fn save(cli: &Cli, save: &str, image: Option<&str>, window: usize) -> Result<(), CliError> {
    let bytes = std::fs::read(save)
        .with_context(|| format!("read {save}"))
        .map_err(CliError::Input)?;
    let snapshot = Snapshot::from_archive(&bytes)
        .with_context(|| format!("parse {save}"))
        .map_err(CliError::Input)?;
    let cid = snapshot.cid().map_err(|e| CliError::Other(e.into()))?;

    let around: Vec<Listing> = match image {
        Some(path) => {
            let mut machine = load(path, cli.text)?;
            machine.restore(&snapshot);
            syn_vm::Disassembly::new(machine.memory(), snapshot.pc)
                .take(window)
                .collect()
        }
        None => Vec::new(),
    };

    if cli.json {
        let out = json!({
            "cid": cid,
            "pc": snapshot.pc,
            "registers": snapshot.registers,
            "stack": snapshot.stack,
            "changed": snapshot.changed.len(),
            "input": snapshot.input,
            "echo": snapshot.echo,
            "output": snapshot.output,
            "listing": around.iter().map(format::listing_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| CliError::Other(e.into()))?);
        return Ok(());
    }

    println!("{} {}", "cid:".bold(), cid);
    println!("{} {}", "pc:".bold(), snapshot.pc);
    println!("{} {:?}", "registers:".bold(), snapshot.registers);
    println!("{} {:?}", "stack:".bold(), snapshot.stack);
    println!("{} {} cells", "changed:".bold(), snapshot.changed.len());
    println!("{} {:?}", "pending input:".bold(), snapshot.input);
    println!("{} {:?}", "output buffer:".bold(), snapshot.output);
    for line in &around {
        println!("{}", format::listing_line(line));
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::Dump { image, from, count } => dump(cli, image, *from, *count),
        Commands::Decode { image, addr } => decode_one(cli, image, *addr),
        Commands::Save {
            save: path,
            image,
            window,
        } => save(cli, path, image.as_deref(), *window),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e.error());
        process::exit(e.code());
    }
}
