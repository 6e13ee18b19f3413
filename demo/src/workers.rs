use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use static_queue::StaticQueue;

use crate::{
    record::{Payload, Record, MAX_RECORD_SIZE},
    trace::{Consumption, TraceWriter},
};

/// How long a blocked worker waits before re-checking for shutdown.
const POLL: Duration = Duration::from_millis(50);

/// Run state shared by every worker.
pub struct Control {
    shutdown: Arc<AtomicBool>,
    producers_running: AtomicUsize,
    consumers_running: AtomicUsize,
}

impl Control {
    pub fn new(shutdown: Arc<AtomicBool>, producers: usize, consumers: usize) -> Self {
        Self {
            shutdown,
            producers_running: AtomicUsize::new(producers),
            consumers_running: AtomicUsize::new(consumers),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn producer_finished(&self) {
        self.producers_running.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn consumer_finished(&self) {
        self.consumers_running.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn producers_done(&self) -> bool {
        self.producers_running.load(Ordering::Acquire) == 0
    }

    pub fn consumers_done(&self) -> bool {
        self.consumers_running.load(Ordering::Acquire) == 0
    }

    /// Sleeps for `delay`, cut short by shutdown.
    fn pause(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            if self.is_shutdown() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(POLL));
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProducerConfig {
    pub id: u16,
    pub payload: Payload,
    pub burst: u32,
    /// 0 produces until shutdown.
    pub bursts: u32,
    pub delay: Duration,
}

/// Enqueues `burst` records, pauses, repeats. Returns how many records made
/// it into the queue.
pub fn producer(queue: &StaticQueue<'_>, control: &Control, config: ProducerConfig) -> u32 {
    let mut buf = [0u8; MAX_RECORD_SIZE];
    let record_bytes = &mut buf[..config.payload.record_size()];
    let mut seq = 0;

    'run: for round in 0u32.. {
        if config.bursts > 0 && round == config.bursts {
            break;
        }

        for _ in 0..config.burst {
            if control.is_shutdown() {
                break 'run;
            }

            let record = Record::new(config.payload, config.id, seq);
            record.encode(record_bytes);

            while !queue.enqueue_timeout(record_bytes, POLL) {
                if control.consumers_done() {
                    eprintln!("producer{}: no consumers left, dropping {record}", config.id);
                    break 'run;
                }
            }
            println!("producer{}: enqueue {record}", config.id);
            seq += 1;
        }

        control.pause(config.delay);
    }

    seq
}

#[derive(Debug, Clone, Copy)]
pub struct ConsumerConfig {
    pub id: usize,
    pub payload: Payload,
    pub delay: Duration,
}

/// Dequeues and prints records until every producer has finished and the
/// queue is drained. Returns how many records it consumed.
pub fn consumer(
    queue: &StaticQueue<'_>,
    control: &Control,
    trace: Option<&TraceWriter>,
    config: ConsumerConfig,
) -> anyhow::Result<u64> {
    let mut buf = [0u8; MAX_RECORD_SIZE];
    let record_bytes = &mut buf[..config.payload.record_size()];
    let mut consumed = 0;

    loop {
        if !queue.dequeue_timeout(record_bytes, POLL) {
            if control.producers_done() {
                break;
            }
            continue;
        }

        let record = Record::decode(config.payload, record_bytes)?;
        println!("consumer{}: consumption of \"{record}\"", config.id);
        if let Some(trace) = trace {
            trace.record(Consumption {
                consumer: config.id,
                producer: record.producer(),
                seq: record.seq(),
            })?;
        }
        consumed += 1;

        control.pause(config.delay);
    }

    Ok(consumed)
}

/// Reports liveness every `interval` until all consumers have stopped.
pub fn housekeeping(queue: &StaticQueue<'_>, control: &Control, interval: Duration) {
    for i in 0u64.. {
        if control.consumers_done() {
            break;
        }
        println!(
            "housekeeping {i}... queued {}/{} free {}",
            queue.len(),
            queue.capacity(),
            queue.free_slots()
        );

        let deadline = Instant::now() + interval;
        while Instant::now() < deadline && !control.consumers_done() {
            thread::sleep(POLL.min(interval));
        }
    }
}
