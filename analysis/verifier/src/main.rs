use std::{
    collections::{BTreeMap, HashMap},
    io::Read,
};

use anyhow::{bail, Context};
use clap::Parser;

pub mod cli;

use cli::Args;

#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct Consumption {
    consumer: usize,
    producer: u16,
    seq: u32,
}

#[derive(Debug, Default, PartialEq)]
struct Summary {
    records: usize,
    producers: usize,
    consumers: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let file = std::fs::File::open(&args.trace)
        .with_context(|| format!("Opening {}", args.trace.display()))?;
    let rows = load_csv(file)?;
    let summary = verify(&rows)?;

    println!("--- Summary ---");
    println!();
    println!(
        "{} records from {} producers consumed by {} consumers",
        summary.records, summary.producers, summary.consumers
    );
    println!("every record consumed exactly once, in order per consumer");

    Ok(())
}

fn load_csv(input: impl Read) -> anyhow::Result<Vec<Consumption>> {
    let mut reader = csv::Reader::from_reader(input);
    let list: Result<Vec<Consumption>, _> = reader.deserialize().collect();
    list.context("Malformed trace")
}

fn verify(rows: &[Consumption]) -> anyhow::Result<Summary> {
    let mut per_producer: BTreeMap<u16, Vec<u32>> = BTreeMap::new();
    let mut last_seen: HashMap<(usize, u16), u32> = HashMap::new();

    for (line, row) in rows.iter().enumerate() {
        per_producer.entry(row.producer).or_default().push(row.seq);

        if let Some(prev) = last_seen.insert((row.consumer, row.producer), row.seq) {
            if prev >= row.seq {
                bail!(
                    "row {line}: consumer {} saw producer {} seq {} after {prev}",
                    row.consumer,
                    row.producer,
                    row.seq
                );
            }
        }
    }

    for (producer, seqs) in &mut per_producer {
        seqs.sort_unstable();
        for (expected, &seq) in seqs.iter().enumerate() {
            if seq as usize != expected {
                if expected > 0 && seqs[expected - 1] == seq {
                    bail!("producer {producer} seq {seq} consumed twice");
                }
                bail!("producer {producer} seq {expected} never consumed");
            }
        }
    }

    let consumers = last_seen
        .keys()
        .map(|(consumer, _)| *consumer)
        .collect::<std::collections::HashSet<_>>()
        .len();

    Ok(Summary {
        records: rows.len(),
        producers: per_producer.len(),
        consumers,
    })
}

#[cfg(test)]
mod test {
    use super::{load_csv, verify, Summary};

    #[test]
    fn accepts_interleaved_consumers() {
        let rows = load_csv("consumer,producer,seq\n0,0,0\n1,0,1\n0,1,0\n0,0,2\n1,1,1\n".as_bytes())
            .unwrap();
        assert_eq!(
            verify(&rows).unwrap(),
            Summary {
                records: 5,
                producers: 2,
                consumers: 2,
            }
        );
    }

    #[test]
    fn rejects_duplicates() {
        let rows = load_csv("consumer,producer,seq\n0,0,0\n1,0,0\n".as_bytes()).unwrap();
        let err = verify(&rows).unwrap_err().to_string();
        assert!(err.contains("consumed twice"), "{err}");
    }

    #[test]
    fn rejects_gaps() {
        let rows = load_csv("consumer,producer,seq\n0,0,0\n0,0,2\n".as_bytes()).unwrap();
        let err = verify(&rows).unwrap_err().to_string();
        assert!(err.contains("seq 1 never consumed"), "{err}");
    }

    #[test]
    fn rejects_reordering_within_a_consumer() {
        let rows = load_csv("consumer,producer,seq\n0,0,1\n0,0,0\n".as_bytes()).unwrap();
        let err = verify(&rows).unwrap_err().to_string();
        assert!(err.contains("after 1"), "{err}");
    }
}
