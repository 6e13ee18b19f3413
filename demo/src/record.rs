use std::fmt::{self, Display, Write};

use anyhow::{bail, Context};
use arrayvec::ArrayString;
use clap::ValueEnum;

pub const SAMPLE_SIZE: usize = 8;
pub const TEXT_SIZE: usize = 128;

/// Largest record any payload produces.
pub const MAX_RECORD_SIZE: usize = TEXT_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Payload {
    /// 8-byte binary record: producer id, a 32-bit and a 16-bit counter
    Sample,
    /// 128-byte NUL-padded decimal string "<producer>:<seq>"
    Text,
}

impl Payload {
    pub fn record_size(self) -> usize {
        match self {
            Payload::Sample => SAMPLE_SIZE,
            Payload::Text => TEXT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Sample { producer: u16, a: i32, b: i16 },
    Text { producer: u16, seq: u32 },
}

impl Record {
    pub fn new(payload: Payload, producer: u16, seq: u32) -> Self {
        match payload {
            Payload::Sample => Record::Sample {
                producer,
                a: seq as i32,
                b: seq as i16,
            },
            Payload::Text => Record::Text { producer, seq },
        }
    }

    pub fn producer(&self) -> u16 {
        match *self {
            Record::Sample { producer, .. } | Record::Text { producer, .. } => producer,
        }
    }

    pub fn seq(&self) -> u32 {
        match *self {
            Record::Sample { a, .. } => a as u32,
            Record::Text { seq, .. } => seq,
        }
    }

    /// Writes the record into `out`, which must be exactly the payload's
    /// record size.
    pub fn encode(&self, out: &mut [u8]) {
        match *self {
            Record::Sample { producer, a, b } => {
                out[0..2].copy_from_slice(&producer.to_le_bytes());
                out[2..6].copy_from_slice(&a.to_le_bytes());
                out[6..8].copy_from_slice(&b.to_le_bytes());
            }
            Record::Text { producer, seq } => {
                let mut text = ArrayString::<TEXT_SIZE>::new();
                write!(text, "{producer}:{seq}")
                    .expect("two integers and a colon always fit a text record");
                out.fill(0);
                out[..text.len()].copy_from_slice(text.as_bytes());
            }
        }
    }

    pub fn decode(payload: Payload, bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() != payload.record_size() {
            bail!(
                "record is {} bytes, {payload:?} records are {}",
                bytes.len(),
                payload.record_size()
            );
        }

        match payload {
            Payload::Sample => Ok(Record::Sample {
                producer: u16::from_le_bytes([bytes[0], bytes[1]]),
                a: i32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
                b: i16::from_le_bytes([bytes[6], bytes[7]]),
            }),
            Payload::Text => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let text = std::str::from_utf8(&bytes[..end]).context("text record is not UTF-8")?;
                let Some((producer, seq)) = text.split_once(':') else {
                    bail!("malformed text record {text:?}");
                };
                Ok(Record::Text {
                    producer: producer
                        .parse()
                        .with_context(|| format!("bad producer in {text:?}"))?,
                    seq: seq
                        .parse()
                        .with_context(|| format!("bad sequence in {text:?}"))?,
                })
            }
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Sample { producer, a, b } => write!(f, "{producer}: {a} {b}"),
            Record::Text { producer, seq } => write!(f, "{producer}:{seq}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Payload, Record, SAMPLE_SIZE, TEXT_SIZE};

    #[test]
    fn sample_layout() {
        let record = Record::new(Payload::Sample, 3, 70_000);
        let mut out = [0u8; SAMPLE_SIZE];
        record.encode(&mut out);

        assert_eq!(&out[0..2], &[3, 0]);
        assert_eq!(Record::decode(Payload::Sample, &out).unwrap(), record);
        // The short counter wraps while the int keeps counting.
        assert_eq!(record.to_string(), "3: 70000 4464");
        assert_eq!(record.seq(), 70_000);
    }

    #[test]
    fn text_is_nul_padded() {
        let record = Record::new(Payload::Text, 1, 42);
        let mut out = [0xaau8; TEXT_SIZE];
        record.encode(&mut out);

        assert_eq!(&out[..4], b"1:42");
        assert!(out[4..].iter().all(|&b| b == 0));
        let decoded = Record::decode(Payload::Text, &out).unwrap();
        assert_eq!(decoded.producer(), 1);
        assert_eq!(decoded.seq(), 42);
    }

    #[test]
    fn widest_text_record_round_trips() {
        let record = Record::new(Payload::Text, u16::MAX, u32::MAX);
        let mut out = [0u8; TEXT_SIZE];
        record.encode(&mut out);

        assert_eq!(&out[..16], b"65535:4294967295");
        assert_eq!(Record::decode(Payload::Text, &out).unwrap(), record);
    }

    #[test]
    fn rejects_garbage() {
        let mut out = [0u8; TEXT_SIZE];
        out[..5].copy_from_slice(b"hello");
        assert!(Record::decode(Payload::Text, &out).is_err());
        assert!(Record::decode(Payload::Sample, &[0u8; 3]).is_err());
    }
}
