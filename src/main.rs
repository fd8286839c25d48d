// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use vertexflow::config::load_config;
use vertexflow::{Builder, GraphConfig, Options, Packet, PacketError, Payload, Vertex};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--config <defaults.yaml>] <word> [word ...]", program);
    eprintln!("Example: {} --config configs/debug.yaml hello \"\" world", program);
    std::process::exit(1);
}

fn word_packet(word: &str) -> Packet {
    let mut data = Payload::new();
    data.insert("text".to_string(), Value::from(word));
    Packet::new(data)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("vertexflow");

    let (config, words) = match args.get(1).map(String::as_str) {
        Some("--config") => {
            let path = args.get(2).unwrap_or_else(|| usage(program));
            let config = load_config(path)
                .with_context(|| format!("failed to load config from {}", path))?;
            (config, &args[3.min(args.len())..])
        }
        _ => (GraphConfig::default(), &args[1.min(args.len())..]),
    };
    if words.is_empty() {
        usage(program);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let print = Vertex::transmit("print", Options::new(), move |batch: &[Packet]| {
        let _ = tx.send(batch.to_vec());
    });
    let non_empty = Vertex::filter(
        "non-empty",
        Options::new(),
        |p| !p.has_error(),
        vec![print],
    );
    let measure = Vertex::map(
        "measure",
        Options::new(),
        |p| {
            let length = p
                .get("text")
                .and_then(|v| v.as_str().map(str::len))
                .ok_or_else(|| PacketError::new("text field missing"))?;
            if length == 0 {
                return Err(PacketError::new("empty text"));
            }
            p.set("length", length as u64);
            Ok(())
        },
        vec![non_empty],
    );
    let ingest = Vertex::stream("ingest", Options::new(), vec![measure]);

    let graph = Builder::new(&config).build(ingest)?;

    println!("🚀 vertexflow demo");
    println!("═══════════════════");
    println!("Vertices: {:?}", graph.vertex_ids());

    graph.inject(words.iter().map(|w| word_packet(w)).collect());

    let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .map_err(|_| anyhow!("no batch reached the terminus within 5s"))?;

    match result {
        Some(batch) => {
            println!("✅ {} of {} packets reached the terminus", batch.len(), words.len());
            for packet in &batch {
                println!(
                    "  {} {}",
                    packet.id(),
                    json!({ "data": packet.data(), "snapshots": packet.snapshots().len() })
                );
            }
        }
        None => println!("❌ the terminus closed without output"),
    }

    graph.shutdown().await;
    Ok(())
}
