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

//! The message broker transport.
//!
//! This module defines the [`Publisher`] & [`Subscriber`] traits that decouple producers from the
//! consumer, along with two implementations: [`AmqpBroker`], which speaks AMQP 0-9-1 (RabbitMQ)
//! & [`MemoryBroker`], an in-process queue.
//!
//! # Delivery semantics
//!
//! Publishing is fire-and-forget: no confirmation is awaited. Consuming acknowledges
//! automatically: a message is considered handled the moment it is taken off the queue, before
//! any sink sees it. A consumer that dies mid-dispatch loses that message. Delivery is
//! therefore at-most-once.
//!
//! # Examples
//!
//! ```rust
//! use logit::broker::{MemoryBroker, Publisher};
//! let broker = MemoryBroker::default();
//! broker.publish("logs", b"{}").unwrap();
//! assert_eq!(broker.pending("logs"), 1);
//! ```

use crate::error::{Error, Result};

use amiquip::{
    Channel, Connection, ConsumerMessage, ConsumerOptions, Publish, QueueDeclareOptions,
};
use backtrace::Backtrace;
use tracing::{debug, warn};

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    time::Duration,
};

/// How often a blocked subscriber wakes to check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         shutdown flag                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A cloneable "stop taking new messages" flag.
#[derive(Clone, Debug, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Shutdown {
        Shutdown::default()
    }
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                           the traits                                           //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all broker publishers must support.
pub trait Publisher: Send + Sync {
    /// Hand `body` to the broker addressed to `queue`; does not wait for the message to be
    /// consumed (or even routed).
    fn publish(&self, queue: &str, body: &[u8]) -> Result<()>;
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, queue: &str, body: &[u8]) -> Result<()> {
        (**self).publish(queue, body)
    }
}

/// Callbacks invoked by a [`Subscriber`] as it drains a queue.
pub trait MessageHandler {
    /// The subscription is established; messages will follow.
    fn on_ready(&mut self) {}
    fn on_message(&mut self, body: &[u8]);
    /// No more messages will be taken off the queue, whether because shutdown was requested or
    /// because the subscription ended.
    fn on_stop(&mut self) {}
}

/// Operations all broker subscribers must support.
pub trait Subscriber {
    /// Subscribe to `queue` & feed each message to `handler`, one at a time, until `shutdown`
    /// is requested or the broker ends the subscription.
    ///
    /// Failing to establish the subscription is an error; the subscription ending is not.
    fn consume(
        &self,
        queue: &str,
        shutdown: &Shutdown,
        handler: &mut dyn MessageHandler,
    ) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                              AMQP                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

fn amqp_error(err: amiquip::Error) -> Error {
    Error::Broker {
        source: format!("{}", err).into(),
        back: Backtrace::new(),
    }
}

fn declare(channel: &Channel, queue: &str) -> Result<()> {
    // Not durable, not exclusive, not auto-deleted: a single anonymous work queue.
    channel
        .queue_declare(queue, QueueDeclareOptions::default())
        .map_err(amqp_error)?;
    Ok(())
}

struct Session {
    // Held only to keep the connection open; the channel does the work.
    _connection: Connection,
    channel: Channel,
    declared: Vec<String>,
}

impl Session {
    fn open(address: &str) -> Result<Session> {
        let mut connection = Connection::insecure_open(address).map_err(amqp_error)?;
        let channel = connection.open_channel(None).map_err(amqp_error)?;
        Ok(Session {
            _connection: connection,
            channel,
            declared: Vec::new(),
        })
    }
    fn publish(&mut self, queue: &str, body: &[u8]) -> Result<()> {
        if !self.declared.iter().any(|q| q == queue) {
            declare(&self.channel, queue)?;
            self.declared.push(queue.to_owned());
        }
        // The default exchange routes by queue name.
        self.channel
            .basic_publish("", Publish::new(body, queue))
            .map_err(amqp_error)
    }
}

/// Publishing & consuming via an AMQP 0-9-1 broker such as RabbitMQ.
///
/// The publishing side keeps one connection & one channel open across calls; should a publish
/// fail, the session is discarded & re-established on the next one.
pub struct AmqpBroker {
    address: String,
    session: Mutex<Option<Session>>,
}

impl AmqpBroker {
    /// Construct an [`AmqpBroker`] for the broker at `address` (an `amqp://` URL), without
    /// connecting.
    pub fn new<S: Into<String>>(address: S) -> AmqpBroker {
        AmqpBroker {
            address: address.into(),
            session: Mutex::new(None),
        }
    }
    /// Construct an [`AmqpBroker`] & establish the publishing session now, failing if the
    /// broker is unreachable.
    pub fn connect<S: Into<String>>(address: S) -> Result<AmqpBroker> {
        let broker = AmqpBroker::new(address);
        *broker.session.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(Session::open(&broker.address)?);
        Ok(broker)
    }
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Publisher for AmqpBroker {
    fn publish(&self, queue: &str, body: &[u8]) -> Result<()> {
        let mut guard = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(Session::open(&self.address)?);
        }
        let result = match guard.as_mut() {
            Some(session) => session.publish(queue, body),
            None => Ok(()),
        };
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

impl Subscriber for AmqpBroker {
    fn consume(
        &self,
        queue: &str,
        shutdown: &Shutdown,
        handler: &mut dyn MessageHandler,
    ) -> Result<()> {
        let mut connection = Connection::insecure_open(&self.address).map_err(amqp_error)?;
        {
            let channel = connection.open_channel(None).map_err(amqp_error)?;
            let q = channel
                .queue_declare(queue, QueueDeclareOptions::default())
                .map_err(amqp_error)?;
            let consumer = q
                .consume(ConsumerOptions {
                    no_ack: true,
                    ..ConsumerOptions::default()
                })
                .map_err(amqp_error)?;
            debug!(queue, address = %self.address, "subscribed");
            handler.on_ready();

            while !shutdown.is_requested() {
                match consumer.receiver().recv_timeout(POLL_INTERVAL) {
                    Ok(ConsumerMessage::Delivery(delivery)) => handler.on_message(&delivery.body),
                    Ok(_) => {
                        warn!(queue, "broker ended the subscription");
                        break;
                    }
                    Err(err) if err.is_timeout() => continue,
                    Err(_) => break,
                }
            }
            handler.on_stop();
        }
        closed(queue, connection.close())
    }
}

/// Once the subscription is over, a failure to close the connection cleanly is of no
/// consequence to the caller.
fn closed(queue: &str, result: amiquip::Result<()>) -> Result<()> {
    if let Err(err) = result {
        warn!(queue, error = %err, "failed to close the broker connection");
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                           in-process                                           //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Default)]
struct MemoryQueues {
    queues: HashMap<String, VecDeque<Vec<u8>>>,
    closed: bool,
}

#[derive(Default)]
struct MemoryInner {
    state: Mutex<MemoryQueues>,
    ready: Condvar,
}

/// An in-process broker: named FIFO queues shared between every clone.
///
/// Useful for tests, and for running producer & consumer in the same process. Once
/// [`close`](MemoryBroker::close)d, subscribers finish off what's queued & return.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<MemoryInner>,
}

impl MemoryBroker {
    pub fn new() -> MemoryBroker {
        MemoryBroker::default()
    }
    /// Number of messages waiting on `queue`.
    pub fn pending(&self, queue: &str) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queues
            .get(queue)
            .map(|q| q.len())
            .unwrap_or(0)
    }
    /// Accept no further messages; subscribers drain what remains & return.
    pub fn close(&self) {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .closed = true;
        self.inner.ready.notify_all();
    }
}

#[derive(Debug)]
struct Closed;

impl std::fmt::Display for Closed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "the in-process broker has been closed")
    }
}

impl std::error::Error for Closed {}

impl Publisher for MemoryBroker {
    fn publish(&self, queue: &str, body: &[u8]) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(Error::broker(Closed));
        }
        state
            .queues
            .entry(queue.to_owned())
            .or_default()
            .push_back(body.to_vec());
        self.inner.ready.notify_all();
        Ok(())
    }
}

impl Subscriber for MemoryBroker {
    fn consume(
        &self,
        queue: &str,
        shutdown: &Shutdown,
        handler: &mut dyn MessageHandler,
    ) -> Result<()> {
        handler.on_ready();
        while !shutdown.is_requested() {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            let next = state.queues.get_mut(queue).and_then(|q| q.pop_front());
            match next {
                Some(body) => {
                    // Don't hold the lock while the handler runs; it may well publish.
                    drop(state);
                    handler.on_message(&body);
                }
                None if state.closed => break,
                None => {
                    let _ = self
                        .inner
                        .ready
                        .wait_timeout(state, POLL_INTERVAL)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
        handler.on_stop();
        Ok(())
    }
}
