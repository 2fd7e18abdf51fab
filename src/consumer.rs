// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of logit.
//
// logit is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// logit is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with logit.  If not,
// see <http://www.gnu.org/licenses/>.

//! The consumer's receive loop.
//!
//! A [`Consumer`] subscribes to the [`QUEUE`], decodes each message back into an
//! [`Event`] & re-dispatches it to the consumer's own sinks. It moves through three [`State`]s:
//! it is [`Connecting`](State::Connecting) until the subscription is established,
//! [`Consuming`](State::Consuming) thereafter, & [`Draining`](State::Draining) once shutdown has
//! been requested (or the broker has ended the subscription) & it is finishing off.
//!
//! By default each message is dispatched inline, so at most one is in flight & a slow sink
//! slows the loop. With a non-zero backlog, dispatch moves to a worker thread fed through a
//! bounded channel; when the channel is full, new messages are dropped (& reported) rather than
//! allowed to stall the queue.

use crate::{
    broker::{MessageHandler, Shutdown, Subscriber},
    config::Config,
    dispatch::{report_failure, DispatchReport, Dispatcher},
    envelope::{self, QUEUE},
    error::{Error, Result},
    event::Event,
};

use backtrace::Backtrace;
use tracing::{debug, info};

use std::sync::{
    mpsc::{sync_channel, SyncSender, TrySendError},
    Arc, Mutex,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Connecting,
    Consuming,
    Draining,
}

/// What a [`Consumer`] did over the course of one [`run`](Consumer::run).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Messages taken off the queue
    pub received: u64,
    /// Events handed to the dispatcher
    pub dispatched: u64,
    /// Messages that could not be decoded
    pub malformed: u64,
    /// Events discarded because the dispatch backlog was full
    pub dropped: u64,
}

pub struct Consumer<S: Subscriber> {
    subscriber: S,
    dispatcher: Arc<Dispatcher>,
    backlog: usize,
    shutdown: Shutdown,
    state: Arc<Mutex<State>>,
}

impl<S: Subscriber> Consumer<S> {
    /// The backlog is taken from `config`.
    pub fn new(subscriber: S, dispatcher: Dispatcher, config: &Config) -> Consumer<S> {
        Consumer {
            subscriber,
            dispatcher: Arc::new(dispatcher),
            backlog: config.consumer_backlog,
            shutdown: Shutdown::new(),
            state: Arc::new(Mutex::new(State::Connecting)),
        }
    }
    /// Zero means dispatch inline.
    pub fn with_backlog(mut self, backlog: usize) -> Consumer<S> {
        self.backlog = backlog;
        self
    }
    /// A handle through which another thread (a signal handler, say) may stop this consumer.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }
    pub fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
    fn set_state(&self, state: State) {
        debug!(?state, "consumer state change");
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
    /// Decode one message & dispatch it.
    pub fn handle_message(&self, body: &[u8]) -> Result<DispatchReport> {
        Ok(self.dispatcher.dispatch(&envelope::decode(body)?))
    }
    /// Drain the queue until shutdown is requested or the broker ends the subscription.
    ///
    /// Only failing to subscribe is an error; every per-message problem is reported, counted &
    /// passed over.
    pub fn run(&self) -> Result<ConsumerStats> {
        self.set_state(State::Connecting);
        let stats = if self.backlog == 0 {
            self.run_inline()?
        } else {
            self.run_worker()?
        };
        info!(
            received = stats.received,
            dispatched = stats.dispatched,
            malformed = stats.malformed,
            dropped = stats.dropped,
            "consumer stopped"
        );
        Ok(stats)
    }
    fn run_inline(&self) -> Result<ConsumerStats> {
        let mut handler = Inline {
            consumer: self,
            stats: ConsumerStats::default(),
        };
        self.subscriber.consume(QUEUE, &self.shutdown, &mut handler)?;
        Ok(handler.stats)
    }
    fn run_worker(&self) -> Result<ConsumerStats> {
        let (tx, rx) = sync_channel::<Event>(self.backlog);
        let dispatcher = self.dispatcher.clone();
        let worker = std::thread::Builder::new()
            .name("logit-dispatch".to_owned())
            .spawn(move || {
                let mut dispatched = 0u64;
                for event in rx {
                    dispatcher.dispatch(&event);
                    dispatched += 1;
                }
                dispatched
            })
            .map_err(|source| Error::Worker {
                source,
                back: Backtrace::new(),
            })?;

        let mut handler = Queued {
            consumer: self,
            tx: Some(tx),
            capacity: self.backlog,
            stats: ConsumerStats::default(),
        };
        let result = self.subscriber.consume(QUEUE, &self.shutdown, &mut handler);
        // Hanging up lets the worker finish what's already queued & exit.
        handler.tx = None;
        let dispatched = worker.join().unwrap_or_else(|_| {
            report_failure(
                "consumer",
                &Error::Worker {
                    source: std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "the dispatch worker panicked",
                    ),
                    back: Backtrace::new(),
                },
            );
            0
        });
        result?;
        Ok(ConsumerStats {
            dispatched,
            ..handler.stats
        })
    }
}

fn decode(stats: &mut ConsumerStats, body: &[u8]) -> Option<Event> {
    stats.received += 1;
    match envelope::decode(body) {
        Ok(event) => Some(event),
        Err(err) => {
            stats.malformed += 1;
            report_failure("consumer", &err);
            None
        }
    }
}

struct Inline<'a, S: Subscriber> {
    consumer: &'a Consumer<S>,
    stats: ConsumerStats,
}

impl<S: Subscriber> MessageHandler for Inline<'_, S> {
    fn on_ready(&mut self) {
        self.consumer.set_state(State::Consuming);
    }
    fn on_stop(&mut self) {
        self.consumer.set_state(State::Draining);
    }
    fn on_message(&mut self, body: &[u8]) {
        if let Some(event) = decode(&mut self.stats, body) {
            self.consumer.dispatcher.dispatch(&event);
            self.stats.dispatched += 1;
        }
    }
}

struct Queued<'a, S: Subscriber> {
    consumer: &'a Consumer<S>,
    tx: Option<SyncSender<Event>>,
    capacity: usize,
    stats: ConsumerStats,
}

impl<S: Subscriber> MessageHandler for Queued<'_, S> {
    fn on_ready(&mut self) {
        self.consumer.set_state(State::Consuming);
    }
    fn on_stop(&mut self) {
        // The worker may still be working through the backlog.
        self.consumer.set_state(State::Draining);
    }
    fn on_message(&mut self, body: &[u8]) {
        let event = match decode(&mut self.stats, body) {
            Some(event) => event,
            None => return,
        };
        let sent = match &self.tx {
            Some(tx) => tx.try_send(event),
            None => return,
        };
        match sent {
            Ok(()) => (),
            Err(TrySendError::Full(_)) => {
                self.stats.dropped += 1;
                report_failure(
                    "consumer",
                    &Error::BacklogFull {
                        capacity: self.capacity,
                        back: Backtrace::new(),
                    },
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.dropped += 1;
                // The worker is gone; nothing more will be dispatched.
                self.consumer.shutdown.request();
            }
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::{
        broker::{MemoryBroker, Publisher},
        dispatch::test::Recorder,
        level::Level,
        sink::{test::event, Sink},
    };

    use std::{sync::Condvar, time::Duration};

    fn publish_all(broker: &MemoryBroker, levels: &[Level]) {
        for level in levels {
            broker
                .publish(QUEUE, &envelope::encode(&event(*level)).unwrap())
                .unwrap();
        }
    }

    #[test]
    fn malformed_then_valid() {
        let broker = MemoryBroker::new();
        broker.publish(QUEUE, b"this is not JSON").unwrap();
        publish_all(&broker, &[Level::INFO, Level::ERROR]);
        broker.close();

        let recorder = Recorder::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.push(recorder.clone());
        let consumer = Consumer::new(broker.clone(), dispatcher, &Config::default());
        assert_eq!(consumer.state(), State::Connecting);

        let stats = consumer.run().unwrap();
        assert_eq!(consumer.state(), State::Draining);
        assert_eq!(
            stats,
            ConsumerStats {
                received: 3,
                dispatched: 2,
                malformed: 1,
                dropped: 0
            }
        );
        let events = recorder.0.lock().unwrap();
        assert_eq!(events[0].level(), Level::INFO);
        assert_eq!(events[0].text(), "someLogText");
        assert_eq!(events[1].err_code(), "E1");
        assert_eq!(broker.pending(QUEUE), 0);
    }

    #[test]
    fn handle_message() {
        let consumer = Consumer::new(MemoryBroker::new(), Dispatcher::new(), &Config::default());
        assert!(consumer.handle_message(b"{").is_err());
        let report = consumer
            .handle_message(&envelope::encode(&event(Level::WARN)).unwrap())
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.attempted(), 0);
    }

    #[test]
    fn worker_drains() {
        let broker = MemoryBroker::new();
        publish_all(&broker, &[Level::TRACE, Level::INFO, Level::WARN, Level::ERROR]);
        broker.close();

        let recorder = Recorder::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.push(recorder.clone());
        let config = Config::builder().consumer_backlog(16).build().unwrap();
        let stats = Consumer::new(broker, dispatcher, &config).run().unwrap();
        assert_eq!(stats.received, 4);
        assert_eq!(stats.dispatched, 4);
        assert_eq!(stats.dropped, 0);
        let levels: Vec<Level> = recorder.0.lock().unwrap().iter().map(|e| e.level()).collect();
        assert_eq!(levels, vec![Level::TRACE, Level::INFO, Level::WARN, Level::ERROR]);
    }

    /// A sink that blocks until released
    #[derive(Clone, Default)]
    struct Gate(Arc<(Mutex<bool>, Condvar)>);

    impl Gate {
        fn open(&self) {
            *self.0 .0.lock().unwrap() = true;
            self.0 .1.notify_all();
        }
    }

    impl Sink for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }
        fn deliver(&self, _: &Event) -> Result<()> {
            let mut open = self.0 .0.lock().unwrap();
            while !*open {
                open = self.0 .1.wait(open).unwrap();
            }
            Ok(())
        }
    }

    #[test]
    fn hung_sink_does_not_stall_draining() {
        let broker = MemoryBroker::new();
        publish_all(&broker, &[Level::INFO; 6]);
        broker.close();

        let gate = Gate::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.push(gate.clone());
        let consumer = Consumer::new(broker.clone(), dispatcher, &Config::default()).with_backlog(1);

        let opener = {
            let gate = gate.clone();
            let broker = broker.clone();
            std::thread::spawn(move || {
                // Release the sink only once the queue has been emptied.
                while broker.pending(QUEUE) > 0 {
                    std::thread::sleep(Duration::from_millis(5));
                }
                std::thread::sleep(Duration::from_millis(50));
                gate.open();
            })
        };
        let stats = consumer.run().unwrap();
        opener.join().unwrap();

        assert_eq!(stats.received, 6);
        assert_eq!(stats.malformed, 0);
        assert_eq!(stats.dispatched + stats.dropped, 6);
        // One in the worker's hands, at most one waiting in the channel
        assert!(stats.dropped >= 4, "{:?}", stats);
    }

    #[test]
    fn draining_while_backlog_dispatches() {
        let broker = MemoryBroker::new();
        publish_all(&broker, &[Level::INFO]);
        broker.close();

        let gate = Gate::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.push(gate.clone());
        let consumer = Consumer::new(broker, dispatcher, &Config::default()).with_backlog(4);

        let stats = std::thread::scope(|scope| {
            let running = scope.spawn(|| consumer.run().unwrap());
            let mut waited = 0;
            while consumer.state() != State::Draining {
                assert!(waited < 1000, "never started draining");
                std::thread::sleep(Duration::from_millis(5));
                waited += 1;
            }
            // The queue is done with, but the worker is still stuck in the sink.
            assert!(!running.is_finished());
            gate.open();
            running.join().unwrap()
        });
        assert_eq!(stats.received, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(consumer.state(), State::Draining);
    }

    #[test]
    fn shutdown_stops_consuming() {
        let broker = MemoryBroker::new();
        let consumer = Consumer::new(broker.clone(), Dispatcher::new(), &Config::default());
        let handle = consumer.shutdown_handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.request();
        });
        // Never closed: the shutdown request is the only way out.
        let stats = consumer.run().unwrap();
        stopper.join().unwrap();
        assert_eq!(stats, ConsumerStats::default());
        assert_eq!(consumer.state(), State::Draining);
    }
}
