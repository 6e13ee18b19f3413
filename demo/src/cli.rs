use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use static_queue::WaitStrategy;

use crate::record::Payload;

/// Producer/consumer exerciser for the static queue
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// Number of record slots in the queue
    #[arg(short, long, default_value_t = 32, value_parser = clap::value_parser!(u32).range(1..=1 << 20))]
    pub capacity: u32,

    /// Record layout carried through the queue
    #[arg(long, value_enum, default_value_t = Payload::Sample)]
    pub payload: Payload,

    /// Number of producer threads
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub producers: u16,

    /// Records enqueued by a producer before it pauses
    #[arg(short, long, default_value_t = 16)]
    pub burst: u32,

    /// Bursts per producer
    ///
    /// Set to 0 to produce until Ctrl-C
    #[arg(long, default_value_t = 0)]
    pub bursts: u32,

    /// Pause after each burst, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub producer_delay_ms: u64,

    /// Pause after each consumed record, in milliseconds
    ///
    /// One consumer thread is started per value
    #[arg(long = "consumer-delay-ms", default_values_t = [100, 500])]
    pub consumer_delays_ms: Vec<u64>,

    /// Interval between housekeeping reports, in milliseconds
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub housekeeping_ms: u64,

    /// How blocked producers and consumers wait
    #[arg(long, value_enum, default_value_t = Strategy::Park)]
    pub strategy: Strategy,

    /// Append every consumed record to this CSV file
    #[arg(long)]
    pub trace: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Sleep until woken by the opposite side
    Park,
    /// Spin, yielding the processor between attempts
    Yield,
}

impl From<Strategy> for WaitStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Park => WaitStrategy::Park,
            Strategy::Yield => WaitStrategy::Yield,
        }
    }
}
