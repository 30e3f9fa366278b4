//! Single-threaded event loop with timers and off-thread blocking jobs.
//!
//! # Design
//! Every callback the core sees runs on the thread that calls `run`. Blocking
//! work (an HTTP round-trip) runs on a spawned thread and posts its
//! `Delivery` back over a channel; the loop then hands it to the
//! continuation registered for that job. Cancelling a job only forgets the
//! continuation, the thread is left to finish and its result is dropped.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use dualfetch_core::{HttpResponse, Timer, TimerId};
use tracing::debug;

/// What a blocking job produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Response(HttpResponse),
    TimedOut,
    /// No response at all, e.g. connection refused.
    Failed(String),
}

type Task = Box<dyn FnOnce()>;
type Continuation = Box<dyn FnOnce(Delivery)>;

struct State {
    timers: RefCell<BTreeMap<(Instant, u64), Task>>,
    deadlines: RefCell<HashMap<u64, Instant>>,
    jobs: RefCell<HashMap<u64, Continuation>>,
    next_id: Cell<u64>,
    tx: Sender<(u64, Delivery)>,
    rx: Receiver<(u64, Delivery)>,
}

/// Cheap-to-clone handle; clones drive the same loop.
#[derive(Clone)]
pub struct EventLoop {
    state: Rc<State>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: Rc::new(State {
                timers: RefCell::new(BTreeMap::new()),
                deadlines: RefCell::new(HashMap::new()),
                jobs: RefCell::new(HashMap::new()),
                next_id: Cell::new(0),
                tx,
                rx,
            }),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        id
    }

    /// Run `work` on its own thread and feed its result to `then` on the
    /// loop thread. Returns the job id for `cancel_job`.
    pub fn spawn<W>(&self, work: W, then: Continuation) -> u64
    where
        W: FnOnce() -> Delivery + Send + 'static,
    {
        let id = self.next_id();
        self.state.jobs.borrow_mut().insert(id, then);
        let tx = self.state.tx.clone();
        thread::spawn(move || {
            // The loop may be gone by now; nobody is left to tell.
            let _ = tx.send((id, work()));
        });
        id
    }

    /// Forget a job's continuation. Returns whether it was still pending.
    pub fn cancel_job(&self, id: u64) -> bool {
        let removed = self.state.jobs.borrow_mut().remove(&id);
        removed.is_some()
    }

    /// Nothing scheduled and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.state.timers.borrow().is_empty() && self.state.jobs.borrow().is_empty()
    }

    /// Process timers and job results until the loop is idle.
    pub fn run(&self) {
        loop {
            self.fire_due_timers();
            if self.is_idle() {
                debug!("event loop idle");
                return;
            }

            let next_deadline = self.state.timers.borrow().keys().next().map(|(at, _)| *at);
            let message = match next_deadline {
                Some(at) => {
                    match self.state.rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                        Ok(message) => Some(message),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                None => match self.state.rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => return,
                },
            };

            if let Some((id, delivery)) = message {
                self.complete(id, delivery);
            }
        }
    }

    fn complete(&self, id: u64, delivery: Delivery) {
        let then = self.state.jobs.borrow_mut().remove(&id);
        match then {
            Some(then) => then(delivery),
            None => debug!(job = id, "dropping result of cancelled job"),
        }
    }

    fn fire_due_timers(&self) {
        loop {
            let now = Instant::now();
            let due = {
                let mut timers = self.state.timers.borrow_mut();
                let is_due = timers.keys().next().is_some_and(|(at, _)| *at <= now);
                if is_due {
                    timers.pop_first()
                } else {
                    None
                }
            };
            let Some(((_, id), task)) = due else {
                return;
            };
            self.state.deadlines.borrow_mut().remove(&id);
            task();
        }
    }
}

impl Timer for EventLoop {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = self.next_id();
        let at = Instant::now() + delay;
        self.state.timers.borrow_mut().insert((at, id), task);
        self.state.deadlines.borrow_mut().insert(id, at);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        let at = self.state.deadlines.borrow_mut().remove(&id.0);
        if let Some(at) = at {
            self.state.timers.borrow_mut().remove(&(at, id.0));
        }
    }
}
