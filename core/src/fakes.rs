//! In-memory hosts for unit tests. Nothing runs until a test says so.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::RequestConfig;
use crate::env::{Environment, ScriptId, ScriptLoader, ScriptTag, Timer, TimerId};
use crate::http::{HttpClient, HttpEvent, HttpRequest, HttpSink, RequestId};
use crate::outcome::{Failure, Success};
use crate::registry::CallbackRegistry;

type Task = Box<dyn FnOnce()>;

/// Timer whose tasks only run when fired by hand. Ids are schedule order.
#[derive(Default)]
pub(crate) struct ManualTimer {
    tasks: RefCell<Vec<Option<Task>>>,
}

impl ManualTimer {
    pub fn pending(&self) -> usize {
        self.tasks.borrow().iter().filter(|task| task.is_some()).count()
    }

    pub fn fire(&self, index: usize) {
        let task = self.tasks.borrow_mut().get_mut(index).and_then(Option::take);
        if let Some(task) = task {
            task();
        }
    }

    pub fn fire_all(&self) {
        for task in self.take_all() {
            task();
        }
    }

    /// Remove every pending task without running it, as if each had already
    /// been popped off the host's queue.
    pub fn take_all(&self) -> Vec<Task> {
        self.tasks
            .borrow_mut()
            .iter_mut()
            .filter_map(Option::take)
            .collect()
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, _delay: Duration, task: Task) -> TimerId {
        let mut tasks = self.tasks.borrow_mut();
        tasks.push(Some(task));
        TimerId((tasks.len() - 1) as u64)
    }

    fn cancel(&self, id: TimerId) {
        if let Some(slot) = self.tasks.borrow_mut().get_mut(id.0 as usize) {
            *slot = None;
        }
    }
}

struct Attached {
    tag: ScriptTag,
    on_load: Option<Task>,
    detached: bool,
}

/// Script loader that records what was attached and detached.
#[derive(Default)]
pub(crate) struct RecordingScripts {
    scripts: RefCell<Vec<Attached>>,
}

impl RecordingScripts {
    pub fn attached_count(&self) -> usize {
        self.scripts.borrow().len()
    }

    pub fn attached_tag(&self, index: usize) -> ScriptTag {
        self.scripts.borrow()[index].tag.clone()
    }

    pub fn is_detached(&self, index: usize) -> bool {
        self.scripts.borrow()[index].detached
    }

    pub fn load(&self, index: usize) {
        let on_load = self.scripts.borrow_mut()[index].on_load.take();
        if let Some(on_load) = on_load {
            on_load();
        }
    }
}

impl ScriptLoader for RecordingScripts {
    fn attach(&self, tag: ScriptTag, on_load: Task) -> ScriptId {
        let mut scripts = self.scripts.borrow_mut();
        scripts.push(Attached {
            tag,
            on_load: Some(on_load),
            detached: false,
        });
        ScriptId((scripts.len() - 1) as u64)
    }

    fn detach(&self, id: ScriptId) {
        if let Some(script) = self.scripts.borrow_mut().get_mut(id.0 as usize) {
            script.detached = true;
            script.on_load = None;
        }
    }
}

struct Sent {
    request: HttpRequest,
    sink: Option<HttpSink>,
    aborted: bool,
}

/// HTTP client that records requests; tests push events with `emit`.
#[derive(Default)]
pub(crate) struct ScriptedHttp {
    requests: RefCell<Vec<Sent>>,
}

impl ScriptedHttp {
    pub fn sent_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn sent(&self, index: usize) -> HttpRequest {
        self.requests.borrow()[index].request.clone()
    }

    pub fn was_aborted(&self, index: usize) -> bool {
        self.requests.borrow()[index].aborted
    }

    /// Deliver `event` even if the request was aborted, to model a
    /// completion racing the abort.
    pub fn emit(&self, index: usize, event: HttpEvent) {
        let sink = self.requests.borrow_mut()[index].sink.take();
        if let Some(mut sink) = sink {
            sink(event);
            self.requests.borrow_mut()[index].sink = Some(sink);
        }
    }
}

impl HttpClient for ScriptedHttp {
    fn send(&self, request: HttpRequest, sink: HttpSink) -> RequestId {
        let mut requests = self.requests.borrow_mut();
        requests.push(Sent {
            request,
            sink: Some(sink),
            aborted: false,
        });
        RequestId((requests.len() - 1) as u64)
    }

    fn abort(&self, id: RequestId) {
        if let Some(sent) = self.requests.borrow_mut().get_mut(id.0 as usize) {
            sent.aborted = true;
        }
    }
}

pub(crate) struct Fakes {
    pub http: Rc<ScriptedHttp>,
    pub scripts: Rc<RecordingScripts>,
    pub timer: Rc<ManualTimer>,
    pub registry: CallbackRegistry,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            http: Rc::new(ScriptedHttp::default()),
            scripts: Rc::new(RecordingScripts::default()),
            timer: Rc::new(ManualTimer::default()),
            registry: CallbackRegistry::default(),
        }
    }

    pub fn env(&self) -> Environment {
        Environment::with_registry(
            self.http.clone(),
            self.scripts.clone(),
            self.timer.clone(),
            self.registry.clone(),
        )
    }
}

/// Collects whatever reaches `on_success` / `on_failure`.
#[derive(Clone, Default)]
pub(crate) struct Outcomes {
    log: Rc<RefCell<Vec<Result<Success, Failure>>>>,
}

impl Outcomes {
    pub fn wire(&self, config: RequestConfig) -> RequestConfig {
        let ok = self.log.clone();
        let err = self.log.clone();
        config
            .on_success(move |success| ok.borrow_mut().push(Ok(success)))
            .on_failure(move |failure| err.borrow_mut().push(Err(failure)))
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn only_success(&self) -> Success {
        let log = self.log.borrow();
        assert_eq!(log.len(), 1, "expected exactly one outcome, got {:?}", *log);
        match &log[0] {
            Ok(success) => success.clone(),
            Err(failure) => panic!("expected success, got {failure:?}"),
        }
    }

    pub fn only_failure(&self) -> Failure {
        let log = self.log.borrow();
        assert_eq!(log.len(), 1, "expected exactly one outcome, got {:?}", *log);
        match &log[0] {
            Err(failure) => failure.clone(),
            Ok(success) => panic!("expected failure, got {success:?}"),
        }
    }
}
