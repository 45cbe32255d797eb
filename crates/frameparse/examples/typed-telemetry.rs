//! Typed telemetry example: decodes two sensor frame types from a noisy,
//! arbitrarily split byte stream on the caller's thread.
//!
//! Run with:
//!   cargo run -p frameparse --example typed-telemetry

use bytes::BytesMut;
use frameparse::engine::{ChannelSink, Engine, EngineConfig, ParseEvent, ProcessingMode};
use frameparse::frame::{
    encode_frame, FrameImageParser, ReferenceHeader, ReferenceProtocol, HEADER_SIZE,
};
use frameparse::image::{BinaryImage, FrameImage, Identified, ImageError};
use frameparse::output_types;

#[derive(Debug, Clone, PartialEq)]
enum Reading {
    Voltage(Voltage),
    Temperature(Temperature),
}

/// Type 0x10: millivolts, big-endian u16.
#[derive(Debug, Clone, Default, PartialEq)]
struct Voltage {
    millivolts: u16,
}

/// Type 0x11: tenths of a degree, big-endian i16.
#[derive(Debug, Clone, Default, PartialEq)]
struct Temperature {
    decidegrees: i16,
}

impl Identified for Voltage {
    type TypeId = u8;
    const TYPE_ID: u8 = 0x10;
}

impl Identified for Temperature {
    type TypeId = u8;
    const TYPE_ID: u8 = 0x11;
}

impl From<Voltage> for Reading {
    fn from(value: Voltage) -> Self {
        Self::Voltage(value)
    }
}

impl From<Temperature> for Reading {
    fn from(value: Temperature) -> Self {
        Self::Temperature(value)
    }
}

impl Reading {
    fn frame_type(&self) -> u8 {
        match self {
            Self::Voltage(_) => Voltage::TYPE_ID,
            Self::Temperature(_) => Temperature::TYPE_ID,
        }
    }

    fn body(&self) -> [u8; 2] {
        match self {
            Self::Voltage(v) => v.millivolts.to_be_bytes(),
            Self::Temperature(t) => t.decidegrees.to_be_bytes(),
        }
    }
}

impl BinaryImage for Reading {
    fn binary_length(&self) -> usize {
        HEADER_SIZE + 2
    }

    fn generate_image(&self, buffer: &mut [u8]) -> Result<usize, ImageError> {
        let mut dst = BytesMut::new();
        encode_frame(self.frame_type(), &self.body(), &mut dst)?;
        if buffer.len() < dst.len() {
            return Err(ImageError::BufferTooSmall {
                needed: dst.len(),
                available: buffer.len(),
            });
        }
        buffer[..dst.len()].copy_from_slice(&dst);
        Ok(dst.len())
    }

    fn parse_image(&mut self, buffer: &[u8]) -> Result<usize, ImageError> {
        let header = ReferenceHeader::decode(buffer)?.ok_or(ImageError::Truncated {
            needed: HEADER_SIZE,
            available: buffer.len(),
        })?;
        Ok(HEADER_SIZE + self.initialize(header, &buffer[HEADER_SIZE..])?)
    }
}

impl FrameImage for Reading {
    type Header = ReferenceHeader;

    fn initialize(&mut self, header: ReferenceHeader, body: &[u8]) -> Result<usize, ImageError> {
        if header.length != 2 {
            return Err(ImageError::invalid(format_args!(
                "sensor frames carry 2 bytes, header says {}",
                header.length
            )));
        }
        ImageError::ensure_available(2, body.len())?;
        let raw = [body[0], body[1]];
        match self {
            Self::Voltage(v) => v.millivolts = u16::from_be_bytes(raw),
            Self::Temperature(t) => t.decidegrees = i16::from_be_bytes(raw),
        }
        Ok(2)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protocol: ReferenceProtocol<Reading> =
        ReferenceProtocol::new(output_types![Voltage, Temperature]);
    let (sink, events) = ChannelSink::unbounded();
    let config = EngineConfig {
        name: "telemetry".to_string(),
        mode: ProcessingMode::Inline,
        ..EngineConfig::default()
    };
    let mut engine: Engine<_> = Engine::new(FrameImageParser::new(protocol), config, sink);
    engine.start()?;

    let readings = [
        Reading::Voltage(Voltage { millivolts: 3300 }),
        Reading::Temperature(Temperature { decidegrees: -125 }),
        Reading::Voltage(Voltage { millivolts: 5000 }),
    ];

    // Line noise first, then every reading split into three-byte writes.
    let mut stream = vec![0x13, 0x37];
    for reading in &readings {
        stream.extend_from_slice(&reading.to_bytes()?);
    }
    for chunk in stream.chunks(3) {
        engine.write(chunk)?;
    }

    for event in events.try_iter() {
        match event {
            ParseEvent::Parsed { output, .. } => println!("{output:?}"),
            other => eprintln!("{other}"),
        }
    }
    print!("{}", engine.status());

    engine.stop();
    Ok(())
}
