use std::io::{ErrorKind, Read};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::drivers::source::SampleSource;
use crate::drivers::{PlotterError, ReadError};

/// Baud rates offered by the front end.
pub const BAUD_OPTIONS: [u32; 11] = [
    300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200,
];

pub const DEFAULT_BAUD: u32 = 9600;

// Frames longer than this without a newline are treated as garbage.
const MAX_PENDING_BYTES: usize = 4096;

static FRAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?P<name>[^:]+):\s*(?P<value>-?[\d.]+)").expect("frame pattern compiles")
});

/// Names of the serial ports currently visible to the OS. Never fails; an
/// enumeration error is logged and reported as an empty list.
pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(err) => {
            log::warn!("failed to enumerate serial ports: {err}");
            Vec::new()
        }
    }
}

pub fn parse_baud(raw: &str) -> Result<u32, PlotterError> {
    match raw.trim().parse::<u32>() {
        Ok(baud) if baud > 0 => Ok(baud),
        _ => Err(PlotterError::InvalidConfiguration(format!(
            "baud rate {raw:?} is not a positive integer"
        ))),
    }
}

/// Parses a single `name: value` frame.
pub fn parse_frame(raw: &str) -> Result<f32, ReadError> {
    let captures = FRAME_PATTERN
        .captures(raw)
        .ok_or_else(|| ReadError::MalformedFrame(raw.to_owned()))?;
    captures["value"]
        .parse::<f32>()
        .map_err(|_| ReadError::MalformedFrame(raw.to_owned()))
}

/// Splits a byte stream into newline-terminated frames.
#[derive(Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), ReadError> {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
            let garbage = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            return Err(ReadError::MalformedFrame(garbage));
        }
        Ok(())
    }

    /// Next complete frame, skipping blank lines.
    pub fn next_frame(&mut self) -> Option<Result<f32, ReadError>> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if !line.is_empty() {
                return Some(parse_frame(line));
            }
        }
        None
    }
}

/// Serial-port backed source (8N1) emitting one sample per decoded frame.
pub struct SerialSource {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    buff: [u8; 255],
    decoder: FrameDecoder,
}

impl std::fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSource")
            .field("port_name", &self.port_name)
            .field("open", &self.port.is_some())
            .finish_non_exhaustive()
    }
}

impl SerialSource {
    pub fn open(port_name: &str, baud: u32, timeout: Duration) -> Result<Self, PlotterError> {
        if port_name.is_empty() {
            return Err(PlotterError::unavailable(port_name, "no serial port selected"));
        }
        log::info!("opening serial port {port_name} at {baud} baud");
        let port = serialport::new(port_name, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(timeout)
            .open()
            .map_err(|err| PlotterError::unavailable(port_name, err))?;
        Ok(Self {
            port_name: port_name.to_owned(),
            port: Some(port),
            buff: [0; 255],
            decoder: FrameDecoder::default(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl SampleSource for SerialSource {
    fn next(&mut self) -> Result<Option<f32>, ReadError> {
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                return frame.map(Some);
            }
            let port = self.port.as_mut().ok_or(ReadError::Disconnected)?;
            match port.read(&mut self.buff) {
                Ok(0) => return Err(ReadError::Disconnected),
                Ok(n) => self.decoder.push(&self.buff[..n])?,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn close(&mut self) -> Result<(), ReadError> {
        if self.port.take().is_some() {
            log::info!("closed serial port {}", self.port_name);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("serial:{}", self.port_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_frames() {
        assert_eq!(parse_frame("temp: 21.5").unwrap(), 21.5);
        assert_eq!(parse_frame("  a:3").unwrap(), 3.0);
        assert_eq!(parse_frame("delta: -4.25").unwrap(), -4.25);
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            parse_frame("no separator here"),
            Err(ReadError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_frame("x: 1.2.3"),
            Err(ReadError::MalformedFrame(_))
        ));
        assert!(matches!(parse_frame("x: abc"), Err(ReadError::MalformedFrame(_))));
    }

    #[test]
    fn decoder_reassembles_split_frames() {
        let mut decoder = FrameDecoder::default();
        decoder.push(b"a: 1").unwrap();
        assert!(decoder.next_frame().is_none());
        decoder.push(b"0\r\n\r\nb: 2\nc: ").unwrap();
        assert_eq!(decoder.next_frame().unwrap().unwrap(), 10.0);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), 2.0);
        assert!(decoder.next_frame().is_none());
        decoder.push(b"oops\n").unwrap();
        assert!(decoder.next_frame().unwrap().is_err());
    }

    #[test]
    fn decoder_rejects_runaway_lines() {
        let mut decoder = FrameDecoder::default();
        let junk = vec![b'x'; MAX_PENDING_BYTES + 1];
        assert!(decoder.push(&junk).is_err());
        decoder.push(b"v: 7\n").unwrap();
        assert_eq!(decoder.next_frame().unwrap().unwrap(), 7.0);
    }

    #[test]
    fn baud_must_be_a_positive_integer() {
        assert_eq!(parse_baud("115200").unwrap(), 115200);
        assert_eq!(parse_baud(" 9600 ").unwrap(), 9600);
        assert!(matches!(
            parse_baud("fast"),
            Err(PlotterError::InvalidConfiguration(_))
        ));
        assert!(parse_baud("0").is_err());
        assert!(BAUD_OPTIONS.contains(&DEFAULT_BAUD));
    }

    #[test]
    fn opening_without_a_port_is_unavailable() {
        let err = SerialSource::open("", DEFAULT_BAUD, Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, PlotterError::SourceUnavailable { .. }));
    }
}
