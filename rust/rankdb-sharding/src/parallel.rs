//! Parallel union of per-shard iterators.
//!
//! Each shard subtree is driven by its own worker thread. Workers hand candidates
//! to the consumer one at a time over a shared rendezvous channel, then wait for
//! the consumer's current score window before advancing again:
//!
//! ```text
//!  worker 0 ──┐  Candidate / Exhausted / Failed
//!  worker 1 ──┼────────────────────────────────► ParallelDocItr::next
//!  worker N ──┘                                        │
//!      ▲              bounds (one slot per worker)     │
//!      └───────────────────────────────────────────────┘
//! ```
//!
//! The reply to a candidate is deferred until the consumer asks for the next
//! one, so a window narrowed in reaction to that candidate already reaches the
//! worker that produced it.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use rankdb_common::{Error, Result};
use rankdb_scoring::{
    BoxedDocItr, DocId, DocItr, NOT_POSITIONED,
    doc_itr::{in_bounds, intersect_bounds},
};

use crate::{ShardOptions, ids::ShardIds};

enum Message {
    Candidate {
        worker: usize,
        doc_id: DocId,
        score: f32,
    },
    Exhausted {
        worker: usize,
    },
    Failed {
        worker: usize,
        error: Error,
    },
}

struct Worker {
    replies: Option<Sender<(f32, f32)>>,
    handle: Option<JoinHandle<()>>,
}

enum State {
    /// Children are still owned by the iterator; no thread has been started.
    Idle(Vec<BoxedDocItr>),
    Running {
        messages: Receiver<Message>,
        workers: Vec<Worker>,
        active: usize,
        /// Worker owed the current window for the candidate it last sent.
        awaiting_reply: Option<usize>,
    },
    Closed,
}

/// Merges shard iterators into one stream of shard-packed document ids.
///
/// Candidates arrive in no particular id order, so the `min_id` argument of
/// [`next`](DocItr::next) is ignored; the top-K engine does not rely on it.
/// Workers only forward candidates inside their last known window, and the
/// consumer drops in-flight candidates that a later narrowing excluded.
pub struct ParallelDocItr {
    state: State,
    ids: ShardIds,
    thread_prefix: String,
    doc_id: DocId,
    score: f32,
    bounds: (f32, f32),
}

impl ParallelDocItr {
    /// Creates the union of `children`; the child at index `i` is shard `i`.
    pub fn new(children: Vec<BoxedDocItr>, options: &ShardOptions) -> Result<ParallelDocItr> {
        let ids = ShardIds::new(options.shard_bits)?;
        ids.check_shard_count(children.len())?;
        let bounds = children.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), child| {
                let (child_min, child_max) = child.get_bounds();
                (min.min(child_min), max.max(child_max))
            },
        );
        Ok(ParallelDocItr {
            state: State::Idle(children),
            ids,
            thread_prefix: options.worker_thread_prefix.clone(),
            doc_id: NOT_POSITIONED,
            score: 0.0,
            bounds,
        })
    }

    fn start(&mut self, children: Vec<BoxedDocItr>) -> Result<()> {
        let (sender, messages) = bounded(0);
        let mut workers = Vec::with_capacity(children.len());
        let mut spawn_error = None;
        for (shard, child) in children.into_iter().enumerate() {
            if spawn_error.is_some() {
                let mut child = child;
                child.close();
                continue;
            }
            let (reply_sender, reply_receiver) = bounded(1);
            let task = ShardTask {
                shard,
                ids: self.ids,
                child,
                bounds: self.bounds,
                messages: sender.clone(),
                replies: reply_receiver,
            };
            match thread::Builder::new()
                .name(format!("{}-{shard}", self.thread_prefix))
                .spawn(move || task.run())
            {
                Ok(handle) => workers.push(Worker {
                    replies: Some(reply_sender),
                    handle: Some(handle),
                }),
                Err(e) => spawn_error = Some(Error::io("spawn shard worker", e)),
            }
        }
        let active = workers.len();
        self.state = State::Running {
            messages,
            workers,
            active,
            awaiting_reply: None,
        };
        match spawn_error {
            Some(e) => {
                self.close();
                Err(e)
            }
            None => Ok(()),
        }
    }

    fn next_running(&mut self) -> Result<bool> {
        let State::Running {
            messages,
            workers,
            active,
            awaiting_reply,
        } = &mut self.state
        else {
            return Ok(false);
        };
        if let Some(worker) = awaiting_reply.take() {
            if let Some(replies) = &workers[worker].replies {
                // The worker is parked on this slot; a failed send means it is gone.
                let _ = replies.send(self.bounds);
            }
        }
        while *active > 0 {
            let message = match messages.recv() {
                Ok(message) => message,
                Err(_) => {
                    return Err(Error::invalid_operation("shard workers disconnected"));
                }
            };
            match message {
                Message::Candidate {
                    worker,
                    doc_id,
                    score,
                } => {
                    if in_bounds(score, self.bounds) {
                        *awaiting_reply = Some(worker);
                        self.doc_id = doc_id;
                        self.score = score;
                        return Ok(true);
                    }
                    // Sent before the window last narrowed.
                    if let Some(replies) = &workers[worker].replies {
                        let _ = replies.send(self.bounds);
                    }
                }
                Message::Exhausted { worker } => {
                    log::debug!("shard worker {worker} finished");
                    workers[worker].replies = None;
                    *active -= 1;
                }
                Message::Failed { worker, error } => {
                    log::debug!("shard worker {worker} failed: {error}");
                    return Err(error);
                }
            }
        }
        Ok(false)
    }
}

impl DocItr for ParallelDocItr {
    fn cur(&self) -> (DocId, f32) {
        (self.doc_id, self.score)
    }

    fn next(&mut self, _min_id: DocId) -> Result<bool> {
        if let State::Idle(_) = self.state {
            if let State::Idle(children) = std::mem::replace(&mut self.state, State::Closed) {
                self.start(children)?;
            }
        }
        let result = self.next_running();
        if !matches!(result, Ok(true)) {
            self.close();
        }
        result
    }

    fn get_bounds(&self) -> (f32, f32) {
        self.bounds
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        self.bounds = intersect_bounds(self.bounds, min, max);
        match &mut self.state {
            State::Idle(children) => {
                // `|` rather than `||`: every child must see the window.
                let (min, max) = self.bounds;
                children
                    .iter_mut()
                    .fold(false, |any, child| child.set_bounds(min, max) | any)
            }
            // Running workers pick the window up with their next reply.
            State::Running { .. } => self.bounds.0 <= self.bounds.1,
            State::Closed => false,
        }
    }

    fn close(&mut self) {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Idle(mut children) => children.iter_mut().for_each(|child| child.close()),
            State::Running {
                messages,
                mut workers,
                ..
            } => {
                // Dropping both channel ends unblocks every worker.
                drop(messages);
                for worker in &mut workers {
                    worker.replies = None;
                }
                for (shard, worker) in workers.iter_mut().enumerate() {
                    if let Some(handle) = worker.handle.take() {
                        if handle.join().is_err() {
                            log::warn!("shard worker {shard} panicked");
                        }
                    }
                }
            }
            State::Closed => {}
        }
    }
}

impl Drop for ParallelDocItr {
    fn drop(&mut self) {
        self.close();
    }
}

/// The loop run by one shard worker thread.
struct ShardTask {
    shard: usize,
    ids: ShardIds,
    child: BoxedDocItr,
    bounds: (f32, f32),
    messages: Sender<Message>,
    replies: Receiver<(f32, f32)>,
}

impl ShardTask {
    fn run(mut self) {
        let message = self.drive();
        if let Some(message) = message {
            // The consumer may already be gone.
            let _ = self.messages.send(message);
        }
        self.child.close();
    }

    /// Feeds candidates until the shard is done. Returns the final message, or
    /// `None` if the consumer hung up.
    fn drive(&mut self) -> Option<Message> {
        let worker = self.shard;
        let mut min_id = 0;
        loop {
            match self.child.next(min_id) {
                Ok(true) => {}
                Ok(false) => return Some(Message::Exhausted { worker }),
                Err(error) => return Some(Message::Failed { worker, error }),
            }
            let (local_id, score) = self.child.cur();
            min_id = local_id + 1;
            if !in_bounds(score, self.bounds) {
                continue;
            }
            let doc_id = match self.ids.pack(self.shard, local_id) {
                Ok(doc_id) => doc_id,
                Err(error) => return Some(Message::Failed { worker, error }),
            };
            let candidate = Message::Candidate {
                worker,
                doc_id,
                score,
            };
            if self.messages.send(candidate).is_err() {
                return None;
            }
            let Ok((min, max)) = self.replies.recv() else {
                return None;
            };
            if (min, max) != self.bounds {
                self.bounds = (min, max);
                if !self.child.set_bounds(min, max) {
                    return Some(Message::Exhausted { worker });
                }
            }
        }
    }
}
