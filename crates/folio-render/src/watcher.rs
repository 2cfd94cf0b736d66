//! Global error observer for the known integration-layer incompatibility.
//!
//! The integration layer offers no typed error channel, so this is the one place where
//! faults are recognised by message text. Everything past the filter is a typed
//! [`RenderFault`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use aho_corasick::AhoCorasick;
use tracing::{debug, warn};

use crate::{CompatFault, CompatRepair, RenderFault, SharedRepair};

/// Message substrings that identify the incompatibility.
pub const DEFAULT_FAULT_SIGNATURES: &[&str] = &[
    "currentOwner",
    "currentBatchConfig",
    "currentDispatcher",
    "reconciler internals",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorReport {
    pub message: String,
    /// Script URL the error came from, when known.
    pub source: Option<String>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Default reporting must be suppressed.
    Handled,
    PassThrough,
}

pub type ListenerId = u64;
pub type ErrorHandler = Box<dyn FnMut(&ErrorReport) -> ErrorDisposition>;

/// Process-wide error event stream.
pub trait ErrorChannel {
    fn subscribe(&self, handler: ErrorHandler) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId);
}

/// Something the supervisor must release on teardown. Disposing twice is a no-op.
pub trait Disposer {
    fn dispose(&mut self);
}

/// Allow-list classifier for error messages.
pub struct FaultFilter {
    patterns: Vec<String>,
    automaton: Option<AhoCorasick>,
}

impl FaultFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let automaton = match AhoCorasick::new(&patterns) {
            Ok(ac) => Some(ac),
            Err(err) => {
                warn!(error = %err, "fault filter could not be built; no errors will match");
                None
            }
        };
        Self {
            patterns,
            automaton,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn classify(&self, report: &ErrorReport) -> Option<CompatFault> {
        let hit = self.automaton.as_ref()?.find(&report.message)?;
        let pattern = &self.patterns[hit.pattern().as_usize()];
        Some(CompatFault::MissingField(pattern.clone()))
    }
}

impl Default for FaultFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FAULT_SIGNATURES.iter().copied())
    }
}

/// Queue of faults waiting for the supervisor's next tick.
#[derive(Debug, Clone, Default)]
pub struct FaultInbox {
    queue: Rc<RefCell<VecDeque<RenderFault>>>,
}

impl FaultInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, fault: RenderFault) {
        self.queue.borrow_mut().push_back(fault);
    }

    pub fn pop(&self) -> Option<RenderFault> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}

/// Subscription handle returned by [`install_watcher`]; unsubscribes on dispose/drop.
pub struct WatcherGuard {
    channel: Rc<dyn ErrorChannel>,
    id: Option<ListenerId>,
}

impl WatcherGuard {
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

impl Disposer for WatcherGuard {
    fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            self.channel.unsubscribe(id);
            debug!(listener = id, "error watcher removed");
        }
    }
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Subscribe a filtered repair handler to `channel`.
///
/// Matching errors force a repair, are forwarded to `inbox` as a typed fault, and are
/// reported back as [`ErrorDisposition::Handled`]. Anything else passes through.
pub fn install_watcher(
    repair: SharedRepair,
    filter: FaultFilter,
    channel: Rc<dyn ErrorChannel>,
    inbox: FaultInbox,
) -> WatcherGuard {
    let handler: ErrorHandler = Box::new(move |report: &ErrorReport| {
        let Some(fault) = filter.classify(report) else {
            return ErrorDisposition::PassThrough;
        };
        warn!(message = %report.message, %fault, "compatibility fault intercepted");
        // The supervisor may be mid-repair when the error fires; it repairs again
        // while handling the queued fault.
        match repair.try_borrow_mut() {
            Ok(mut shim) => {
                shim.force_repair();
            }
            Err(_) => debug!("shim busy; repair deferred to supervisor"),
        }
        inbox.push(RenderFault::Compatibility(fault));
        ErrorDisposition::Handled
    });

    let id = channel.subscribe(handler);
    debug!(listener = id, "error watcher installed");
    WatcherGuard {
        channel,
        id: Some(id),
    }
}

/// In-process [`ErrorChannel`] for native hosts and tests.
#[derive(Default)]
pub struct LocalErrorChannel {
    next_id: RefCell<ListenerId>,
    listeners: RefCell<Vec<(ListenerId, Rc<RefCell<ErrorHandler>>)>>,
}

impl LocalErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Deliver `report` to listeners in subscription order until one handles it.
    pub fn dispatch(&self, report: &ErrorReport) -> ErrorDisposition {
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in listeners {
            let Ok(mut handler) = handler.try_borrow_mut() else {
                continue;
            };
            if (&mut *handler)(report) == ErrorDisposition::Handled {
                return ErrorDisposition::Handled;
            }
        }
        ErrorDisposition::PassThrough
    }
}

impl ErrorChannel for LocalErrorChannel {
    fn subscribe(&self, handler: ErrorHandler) -> ListenerId {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        let id = *next;
        self.listeners
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(handler))));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }
}
