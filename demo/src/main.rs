use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::bail;
use clap::Parser;

use static_queue::StaticQueue;

pub mod cli;
pub mod record;
pub mod trace;
pub mod workers;

use cli::Args;
use trace::TraceWriter;
use workers::{ConsumerConfig, Control, ProducerConfig};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.consumer_delays_ms.is_empty() {
        bail!("At least one consumer is required");
    }

    let exit_signal = Arc::new(AtomicBool::new(false));

    let e = exit_signal.clone();
    ctrlc::set_handler(move || {
        if e.swap(true, Ordering::Relaxed) {
            eprintln!("Killing");
            std::process::exit(1);
        } else {
            eprintln!("CTRL-C received, draining queue (press again to kill)");
        }
    })?;

    let trace = args
        .trace
        .as_deref()
        .map(TraceWriter::create)
        .transpose()?;

    let capacity = args.capacity as usize;
    let record_size = args.payload.record_size();
    // Allocated once, borrowed by the queue for the whole run.
    let mut storage = vec![0u8; capacity * record_size];
    let queue =
        StaticQueue::with_strategy(capacity, record_size, &mut storage, args.strategy.into());

    println!(
        "Initialized queue: {capacity} slots of {record_size} bytes ({:?}, {:?})",
        args.payload, args.strategy
    );

    let control = Control::new(
        exit_signal,
        args.producers as usize,
        args.consumer_delays_ms.len(),
    );

    let (produced, consumed) = thread::scope(|s| {
        let producers: Vec<_> = (0..args.producers)
            .map(|id| {
                let config = ProducerConfig {
                    id,
                    payload: args.payload,
                    burst: args.burst,
                    bursts: args.bursts,
                    delay: Duration::from_millis(args.producer_delay_ms),
                };
                let (queue, control) = (&queue, &control);
                s.spawn(move || {
                    let n = workers::producer(queue, control, config);
                    control.producer_finished();
                    n
                })
            })
            .collect();

        let consumers: Vec<_> = args
            .consumer_delays_ms
            .iter()
            .enumerate()
            .map(|(id, &delay_ms)| {
                let config = ConsumerConfig {
                    id,
                    payload: args.payload,
                    delay: Duration::from_millis(delay_ms),
                };
                let (queue, control, trace) = (&queue, &control, trace.as_ref());
                s.spawn(move || {
                    let result = workers::consumer(queue, control, trace, config);
                    if result.is_err() {
                        control.request_shutdown();
                    }
                    control.consumer_finished();
                    result
                })
            })
            .collect();

        workers::housekeeping(
            &queue,
            &control,
            Duration::from_millis(args.housekeeping_ms),
        );

        let mut produced = 0u64;
        for handle in producers {
            produced += u64::from(handle.join().expect("producer panicked"));
        }
        let mut consumed = 0u64;
        for (id, handle) in consumers.into_iter().enumerate() {
            match handle.join().expect("consumer panicked") {
                Ok(n) => consumed += n,
                Err(e) => eprintln!("consumer{id} failed: {e:#}"),
            }
        }
        (produced, consumed)
    });

    if let Some(trace) = &trace {
        trace.flush()?;
    }

    println!("Produced {produced}, consumed {consumed}");
    if produced != consumed {
        bail!("{} records were not consumed", produced.abs_diff(consumed));
    }

    Ok(())
}
