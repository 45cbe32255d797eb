//! Multi-source example: four producer threads share one queued engine.
//! Each source keeps its own alignment and leftover bytes, so frames split
//! across writes never mix between sources.
//!
//! Run with:
//!   cargo run -p frameparse --example multi-source

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::BytesMut;
use frameparse::engine::{Engine, EngineConfig, ParseEvent};
use frameparse::frame::{encode_frame, FrameImageParser, RawFrame, ReferenceProtocol};

type Event = ParseEvent<u16, RawFrame, u8>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let counts: Arc<Mutex<BTreeMap<u16, usize>>> = Arc::default();
    let sink = {
        let counts = Arc::clone(&counts);
        move |event: Event| match event {
            ParseEvent::Parsed { source, .. } => {
                if let Ok(mut counts) = counts.lock() {
                    *counts.entry(source).or_default() += 1;
                }
            }
            other => eprintln!("{other}"),
        }
    };

    let parser = FrameImageParser::new(ReferenceProtocol::raw([0x01]));
    let mut engine: Engine<_, u16> = Engine::new(parser, EngineConfig::default(), sink);
    engine.start()?;

    thread::scope(|scope| {
        let producers: Vec<_> = (0..4u16)
            .map(|port| {
                let engine = &engine;
                scope.spawn(move || -> Result<(), frameparse::EngineError> {
                    let mut stream = BytesMut::new();
                    for seq in 0..100u16 {
                        encode_frame(0x01, &seq.to_be_bytes(), &mut stream)?;
                    }
                    for chunk in stream.chunks(usize::from(port) + 1) {
                        engine.write_from(port, chunk)?;
                    }
                    Ok(())
                })
            })
            .collect();
        for producer in producers {
            if let Ok(Err(err)) = producer.join() {
                eprintln!("producer failed: {err}");
            }
        }
    });

    engine.flush();
    for (port, frames) in counts.lock().map_err(|_| "counter lock poisoned")?.iter() {
        println!("source {port}: {frames} frames");
    }
    print!("{}", engine.status());
    Ok(())
}
