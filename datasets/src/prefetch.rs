use std::thread::{self, JoinHandle};

use log::error;
use tokio::sync::mpsc::{self, Receiver};

/// The amount of items prepared ahead of the consumer.
pub const PREFETCH_DEPTH: usize = 2;

/// Runs an iterator on a background thread, keeping up to `depth` of its items ready.
///
/// Dropping a `Prefetch` stops the producer. A producer that panics ends the sequence early and
/// the panic is logged once it's joined.
pub struct Prefetch<T> {
    rx: Receiver<T>,
    producer: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Prefetch<T> {
    /// Starts producing the items of `iter` in the background.
    ///
    /// # Arguments
    /// * `iter` - The items to produce.
    /// * `depth` - The maximum amount of ready items waiting for the consumer.
    pub fn spawn<I>(iter: I, depth: usize) -> Self
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(depth.max(1));

        let producer = thread::spawn(move || {
            for item in iter {
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
        });

        Self {
            rx,
            producer: Some(producer),
        }
    }
}

impl<T> Iterator for Prefetch<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.rx.blocking_recv();
        if item.is_none() {
            self.join();
        }

        item
    }
}

impl<T> Prefetch<T> {
    fn join(&mut self) {
        let Some(producer) = self.producer.take() else {
            return;
        };

        if producer.join().is_err() {
            error!("the prefetch producer panicked, the sequence ended early");
        }
    }
}

impl<T> Drop for Prefetch<T> {
    fn drop(&mut self) {
        self.rx.close();
        self.join();
    }
}
