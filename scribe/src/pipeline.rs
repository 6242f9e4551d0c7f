//! The single-writer ingestion pipeline: N concurrent Log handls publish
//! onto an unbounded synchronous channel; one dedicated consumer thread
//! drains it and performs the actual file write, so writes never
//! interleave. The channel's closure doubles as the shutdown signal.

use crate::fs_writer;
use logger::Logger;
use protocol::message::LogRequest;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

const MODULE: &str = "pipeline";

pub struct Pipeline {
    sender: Option<Sender<LogRequest>>,
    counter: Arc<AtomicU64>,
    consumer: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawns the single consumer task. `root_path`/`max_size` are the
    /// Scribe's fixed write-target configuration for its whole lifetime.
    pub fn start(root_path: String, max_size: i64, logger: Logger) -> Self {
        let (sender, receiver) = mpsc::channel::<LogRequest>();
        let counter = Arc::new(AtomicU64::new(0));
        let consumer_counter = Arc::clone(&counter);

        let consumer = thread::spawn(move || {
            for request in receiver {
                match fs_writer::write_line(
                    &root_path,
                    &request.path,
                    &request.filename,
                    &request.line,
                    max_size,
                ) {
                    Ok(()) => {
                        consumer_counter.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        logger.error(&format!("dropping request: {e}"), MODULE);
                    }
                }
            }
        });

        Pipeline {
            sender: Some(sender),
            counter,
            consumer: Some(consumer),
        }
    }

    /// Enqueues a request. Blocks the caller only as long as it takes the
    /// channel to accept the value — the reference back-pressure model.
    pub fn enqueue(&self, request: LogRequest) -> Result<(), protocol::error::ClusterError> {
        match &self.sender {
            Some(sender) => sender
                .send(request)
                .map_err(|_| protocol::error::ClusterError::transient("pipeline consumer has shut down", MODULE)),
            None => Err(protocol::error::ClusterError::transient(
                "pipeline consumer has shut down",
                MODULE,
            )),
        }
    }

    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Closes the producer-facing side and waits for the consumer to
    /// drain whatever is left in the channel, then exits.
    pub fn shutdown(mut self) {
        self.sender.take();
        if let Some(handle) = self.consumer.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.consumer.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread::sleep;
    use std::time::Duration;

    fn temp_root(name: &str) -> String {
        let dir = format!("{}/scribe_pipeline_{name}", std::env::temp_dir().display());
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn enqueued_requests_are_written_in_order() {
        let root = temp_root("order");
        let pipeline = Pipeline::start(root.clone(), -1, Logger::null());

        for payload in ["one", "two", "three"] {
            pipeline
                .enqueue(LogRequest {
                    filename: "a".to_string(),
                    path: "p".to_string(),
                    line: payload.as_bytes().to_vec(),
                })
                .unwrap();
        }

        sleep(Duration::from_millis(200));
        let contents = fs::read_to_string(format!("{root}/p/a.log")).unwrap();
        assert_eq!(contents, "one\ntwo\nthree\n");
        assert_eq!(pipeline.counter(), 3);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn shutdown_drains_pending_requests() {
        let root = temp_root("shutdown");
        let pipeline = Pipeline::start(root.clone(), -1, Logger::null());
        pipeline
            .enqueue(LogRequest {
                filename: "a".to_string(),
                path: "".to_string(),
                line: b"last".to_vec(),
            })
            .unwrap();
        pipeline.shutdown();

        let contents = fs::read_to_string(format!("{root}/a.log")).unwrap();
        assert_eq!(contents, "last\n");
        fs::remove_dir_all(&root).unwrap();
    }
}
