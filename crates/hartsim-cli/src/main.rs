//! hartsim CLI - HART frame inspection and table exercising

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;

use hart_protocol::{build, parse, respond, Address, Frame, FrameType};
use hartsim::{MemoryStore, Repr, SimTable};
use hartsim_core::{codec, CellId, HartType};

#[derive(Parser)]
#[command(name = "hartsim")]
#[command(author, version, about = "HART transmitter simulator tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a hex-encoded HART frame and print its fields
    Decode {
        /// The frame as a hex string (preamble included)
        hex: String,
    },

    /// Build a request frame from its parts and print the hex
    Encode {
        /// Command number (hex, e.g. 01)
        #[arg(short, long)]
        command: String,

        /// Short-frame polling address (hex)
        #[arg(short, long, conflicts_with_all = ["manufacturer", "device_type", "device_id"])]
        polling: Option<String>,

        /// Long-frame manufacturer id (hex)
        #[arg(long, requires = "device_type")]
        manufacturer: Option<String>,

        /// Long-frame device type (hex)
        #[arg(long, requires = "device_id")]
        device_type: Option<String>,

        /// Long-frame device id (6 hex chars)
        #[arg(long, requires = "manufacturer")]
        device_id: Option<String>,

        /// Request body as hex
        #[arg(short, long, default_value = "")]
        body: String,
    },

    /// Convert a value between hex and human form for a HART data type
    Convert {
        /// Data type (UINT, INT, SREAL, DATE, TIME, PACKED_ASCII, ENUM<n>, BIT_ENUM<n>)
        #[arg(short, long)]
        r#type: String,

        /// Hex to decode into a human value
        #[arg(long, conflicts_with = "from_human")]
        to_human: Option<String>,

        /// Human value to encode into hex
        #[arg(long)]
        from_human: Option<String>,

        /// Byte size used when encoding
        #[arg(short, long, default_value = "2")]
        size: usize,
    },

    /// Load a table fixture and dump every cell in human form
    Dump {
        /// JSON fixture file
        fixture: PathBuf,
    },

    /// Load a table fixture and dispatch a request frame against it
    Respond {
        /// JSON fixture file
        fixture: PathBuf,

        /// The request frame as a hex string
        hex: String,
    },
}

/// On-disk table fixture: row -> column -> raw origin string.
#[derive(Deserialize)]
struct Fixture {
    name: String,
    rows: BTreeMap<String, BTreeMap<String, String>>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Decode { hex } => decode(&hex),
        Commands::Encode {
            command,
            polling,
            manufacturer,
            device_type,
            device_id,
            body,
        } => encode(command, polling, manufacturer, device_type, device_id, body),
        Commands::Convert {
            r#type,
            to_human,
            from_human,
            size,
        } => convert(&r#type, to_human, from_human, size),
        Commands::Dump { fixture } => dump(&fixture).await,
        Commands::Respond { fixture, hex } => dispatch(&fixture, &hex).await,
    }
}

fn decode(hex: &str) -> Result<()> {
    let decoded = parse(hex).with_context(|| format!("cannot parse frame '{hex}'"))?;
    let frame = &decoded.frame;
    println!("preamble:  {} bytes", frame.preamble_len);
    println!(
        "type:      {}",
        match frame.frame_type {
            FrameType::Request => "request".to_string(),
            FrameType::Response => "response".to_string(),
            FrameType::Other(b) => format!("other ({b:02X})"),
        }
    );
    println!("master:    {}", if frame.master { "primary" } else { "secondary" });
    println!("burst:     {}", frame.burst);
    match &frame.address {
        Address::Short { polling } => println!("address:   short, polling {polling:02X}"),
        Address::Long {
            manufacturer,
            device_type,
            device_id,
        } => println!(
            "address:   long, manufacturer {manufacturer:02X}, device type {device_type:02X}, id {:02X}{:02X}{:02X}",
            device_id[0], device_id[1], device_id[2]
        ),
    }
    println!("command:   {:02X}", frame.command);
    println!(
        "body:      {}",
        frame
            .body
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<String>()
    );
    println!(
        "checksum:  {}",
        if decoded.checksum_ok { "ok" } else { "INCORRECT" }
    );
    Ok(())
}

fn encode(
    command: String,
    polling: Option<String>,
    manufacturer: Option<String>,
    device_type: Option<String>,
    device_id: Option<String>,
    body: String,
) -> Result<()> {
    let command = u8::from_str_radix(&command, 16).context("command must be a hex byte")?;
    let body = hex_bytes(&body)?;
    let address = match (polling, manufacturer) {
        (Some(p), _) => Address::Short {
            polling: u8::from_str_radix(&p, 16).context("polling must be a hex byte")? & 0x3F,
        },
        (None, Some(m)) => {
            let device_type = device_type.unwrap();
            let device_id = device_id.unwrap();
            let id = hex_bytes(&device_id)?;
            if id.len() != 3 {
                bail!("device id must be 3 bytes");
            }
            Address::Long {
                manufacturer: u8::from_str_radix(&m, 16).context("manufacturer must be hex")?
                    & 0x3F,
                device_type: u8::from_str_radix(&device_type, 16)
                    .context("device type must be hex")?,
                device_id: [id[0], id[1], id[2]],
            }
        }
        (None, None) => bail!("either --polling or the long-frame address fields are required"),
    };
    println!("{}", build(&Frame::request(address, command, body)));
    Ok(())
}

fn convert(
    ty: &str,
    to_human: Option<String>,
    from_human: Option<String>,
    size: usize,
) -> Result<()> {
    let ty: HartType = ty.parse()?;
    match (to_human, from_human) {
        (Some(hex), None) => {
            println!("{}", codec::to_human(&hex, ty)?);
        }
        (None, Some(text)) => {
            let value = codec::parse_text(&text, ty)?;
            println!("{}", codec::from_human(&value, ty, size)?);
        }
        _ => bail!("exactly one of --to-human / --from-human is required"),
    }
    Ok(())
}

async fn load_fixture(path: &PathBuf) -> Result<SimTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read fixture {}", path.display()))?;
    let fixture: Fixture = serde_json::from_str(&text).context("malformed fixture")?;
    let store = Arc::new(MemoryStore::new());
    for (row, cols) in &fixture.rows {
        for (col, value) in cols {
            store.seed(&fixture.name, row, col, value);
        }
    }
    SimTable::load(&fixture.name, store)
        .await
        .context("table load failed")
}

async fn dump(path: &PathBuf) -> Result<()> {
    let table = load_fixture(path).await?;
    for row in table.rows().to_vec() {
        for col in table.columns().to_vec() {
            let id = CellId::new(table.name(), row.clone(), col.clone());
            let shown = table
                .get(&id, Repr::Human)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "#ERR".to_string());
            println!("{row}\t{col}\t{shown}");
        }
    }
    Ok(())
}

async fn dispatch(path: &PathBuf, hex: &str) -> Result<()> {
    let mut table = load_fixture(path).await?;
    let decoded = parse(hex).with_context(|| format!("cannot parse frame '{hex}'"))?;
    if !decoded.checksum_ok {
        eprintln!("warning: request checksum is incorrect");
    }
    match respond(&decoded.frame, &mut table) {
        Some(frame) => println!("{}", build(&frame)),
        None => println!("(no response: no device entry matches the address)"),
    }
    Ok(())
}

fn hex_bytes(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        bail!("hex string must have an even number of digits");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).context("invalid hex"))
        .collect()
}
