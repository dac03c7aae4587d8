#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;

use jobwatch_core::{
    ControllerSettings, Generation, JobRequest, JobSubmitter, LifecycleController, ResultSink,
    StatusPoller, TransportCheckError,
};

/// Everything the fakes observed, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Submitted {
        generation: Generation,
        query: String,
        page_limit: u32,
    },
    PollStarted(Generation),
    PollCancelled(Generation),
    LogUpdate(Vec<String>),
    Success {
        total_items: u64,
        artifact_handle: String,
    },
    Failure(String),
    TransportError(TransportCheckError),
}

pub type Journal = Rc<RefCell<Vec<Event>>>;

pub struct FakeSubmitter {
    journal: Journal,
}

impl JobSubmitter for FakeSubmitter {
    fn submit(&mut self, generation: Generation, request: JobRequest) {
        self.journal.borrow_mut().push(Event::Submitted {
            generation,
            query: request.query().to_string(),
            page_limit: request.page_limit(),
        });
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FakeHandle {
    pub generation: Generation,
}

pub struct FakePoller {
    journal: Journal,
    active: Rc<Cell<usize>>,
    max_active: Rc<Cell<usize>>,
}

impl FakePoller {
    pub fn active(&self) -> usize {
        self.active.get()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.get()
    }
}

impl StatusPoller for FakePoller {
    type Handle = FakeHandle;

    fn start(&mut self, generation: Generation) -> FakeHandle {
        self.journal.borrow_mut().push(Event::PollStarted(generation));
        self.active.set(self.active.get() + 1);
        self.max_active
            .set(self.max_active.get().max(self.active.get()));
        FakeHandle { generation }
    }

    fn cancel(&mut self, handle: FakeHandle) {
        self.journal
            .borrow_mut()
            .push(Event::PollCancelled(handle.generation));
        self.active.set(self.active.get() - 1);
    }
}

pub struct RecordingSink {
    journal: Journal,
}

impl ResultSink for RecordingSink {
    fn on_log_update(&mut self, lines: &[String]) {
        self.journal
            .borrow_mut()
            .push(Event::LogUpdate(lines.to_vec()));
    }

    fn on_success(&mut self, total_items: u64, artifact_handle: &str) {
        self.journal.borrow_mut().push(Event::Success {
            total_items,
            artifact_handle: artifact_handle.to_string(),
        });
    }

    fn on_failure(&mut self, message: &str) {
        self.journal
            .borrow_mut()
            .push(Event::Failure(message.to_string()));
    }

    fn on_transport_error(&mut self, error: &TransportCheckError) {
        self.journal
            .borrow_mut()
            .push(Event::TransportError(error.clone()));
    }
}

pub type TestController = LifecycleController<FakeSubmitter, FakePoller, RecordingSink>;

pub struct Harness {
    pub controller: TestController,
    journal: Journal,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(ControllerSettings::default())
    }

    pub fn with_settings(settings: ControllerSettings) -> Self {
        init_logging();
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let controller = LifecycleController::new(
            FakeSubmitter {
                journal: journal.clone(),
            },
            FakePoller {
                journal: journal.clone(),
                active: Rc::new(Cell::new(0)),
                max_active: Rc::new(Cell::new(0)),
            },
            RecordingSink {
                journal: journal.clone(),
            },
            settings,
        );
        Self {
            controller,
            journal,
        }
    }

    /// Starts a run and accepts it, leaving the controller polling.
    pub fn start_running(&mut self, query: &str) -> Generation {
        let generation = self
            .controller
            .start(JobRequest::new(query, 2))
            .expect("start");
        self.controller.on_submission(generation, Ok(()));
        generation
    }

    pub fn events(&self) -> Vec<Event> {
        self.journal.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<Event> {
        self.journal.borrow_mut().drain(..).collect()
    }

    pub fn terminal_events(&self) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Success { .. } | Event::Failure(_)))
            .count()
    }

    /// A separate handle on the journal, for inspecting it after the controller is gone.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

pub fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|line| line.to_string()).collect()
}

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(jobwatch_logging::initialize_for_tests);
}
