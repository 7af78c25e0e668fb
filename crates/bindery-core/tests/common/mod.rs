//! Shared recording collaborators for integration tests.
//!
//! Renderer, notifier and transport all append to one journal so tests can
//! assert on the relative order of lock, request and message events.

#![allow(dead_code)]

use async_trait::async_trait;
use bindery_core::{
    Application, Element, ElementRef, MemoryElement, Notifier, ResponseStream, Settings,
    SurfaceRenderer, Transport, TransportError, Value, Verb, poll_stream,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

pub type Journal = Rc<RefCell<Vec<String>>>;

// =============================================================================
// RENDERER
// =============================================================================

pub struct RecordingRenderer(pub Journal);

fn label(element: &ElementRef) -> String {
    element.id().unwrap_or_else(|| "?".into())
}

impl SurfaceRenderer for RecordingRenderer {
    fn open_modal(&self, element: &ElementRef) {
        self.0.borrow_mut().push(format!("open:{}", label(element)));
    }

    fn close_modals(&self) {
        self.0.borrow_mut().push("close".into());
    }

    fn show_interface(&self, element: &ElementRef) {
        self.0.borrow_mut().push(format!("show:{}", label(element)));
    }

    fn hide_interfaces(&self) {
        self.0.borrow_mut().push("hide".into());
    }

    fn fill_text(&self, _element: &ElementRef, slot: &str, text: &str) {
        self.0.borrow_mut().push(format!("fill:{slot}={text}"));
    }

    fn fill_list(&self, _element: &ElementRef, slot: &str, items: &[String]) {
        self.0.borrow_mut().push(format!("list:{slot}={}", items.join("|")));
    }
}

// =============================================================================
// NOTIFIER
// =============================================================================

pub struct RecordingNotifier(pub Journal);

#[async_trait(?Send)]
impl Notifier for RecordingNotifier {
    fn show_message(&self, text: &str, _important: bool) {
        self.0.borrow_mut().push(format!("message:{text}"));
    }

    fn show_error(&self, text: &str) {
        self.0.borrow_mut().push(format!("error:{text}"));
    }

    async fn hide_message(&self) {
        self.0.borrow_mut().push("message:hide".into());
    }

    fn show_loading(&self) {
        self.0.borrow_mut().push("lock:show".into());
    }

    async fn hide_loading(&self) {
        self.0.borrow_mut().push("lock:hide".into());
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// One scripted reply.
#[derive(Clone)]
pub struct Reply {
    pub delay: Duration,
    pub result: Result<Value, TransportError>,
}

impl Reply {
    pub fn ok(value: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    pub fn err(error: TransportError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Transport answering from per-URL reply queues. The last reply of a queue
/// repeats; URLs without replies answer `null`.
#[derive(Clone)]
pub struct RecordingTransport {
    journal: Journal,
    replies: Rc<RefCell<BTreeMap<String, VecDeque<Reply>>>>,
    pub requests: Rc<RefCell<Vec<(Verb, String, Value)>>>,
}

impl RecordingTransport {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            replies: Rc::default(),
            requests: Rc::default(),
        }
    }

    pub fn reply(&self, url: &str, reply: Reply) {
        self.replies
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut replies = self.replies.borrow_mut();
        match replies.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Reply::ok(Value::Null)),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Reply::ok(Value::Null)),
            None => Reply::ok(Value::Null),
        }
    }
}

#[async_trait(?Send)]
impl Transport for RecordingTransport {
    async fn send(&self, verb: Verb, url: &str, data: &Value) -> Result<Value, TransportError> {
        self.journal.borrow_mut().push(format!("send:{verb} {url}"));
        self.requests
            .borrow_mut()
            .push((verb, url.to_string(), data.clone()));
        let reply = self.next_reply(url);
        tokio::time::sleep(reply.delay).await;
        reply.result
    }

    fn subscribe(&self, url: &str, data: &Value, interval: Duration) -> ResponseStream {
        let this = self.clone();
        let url = url.to_string();
        let data = data.clone();
        poll_stream(interval, move || {
            let this = this.clone();
            let url = url.clone();
            let data = data.clone();
            async move { this.send(Verb::Get, &url, &data).await }
        })
    }
}

// =============================================================================
// HARNESS
// =============================================================================

pub struct Harness {
    pub app: Application,
    pub journal: Journal,
    pub transport: RecordingTransport,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let journal: Journal = Rc::default();
        let app = Application::new(settings);
        let transport = RecordingTransport::new(Rc::clone(&journal));
        app.install_renderer(Rc::new(RecordingRenderer(Rc::clone(&journal))));
        app.install_notifier(Rc::new(RecordingNotifier(Rc::clone(&journal))));
        app.install_transport(Rc::new(transport.clone()));
        Self {
            app,
            journal,
            transport,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    pub fn clear(&self) {
        self.journal.borrow_mut().clear();
    }
}

/// A plain element usable as a surface, labelled by `id`.
pub fn surface(id: &str) -> Rc<MemoryElement> {
    MemoryElement::plain().with_id(id).shared()
}

/// A save or cancel button.
pub fn button(class: &str) -> Rc<MemoryElement> {
    MemoryElement::plain().with_class(class).shared()
}

/// Run `future` on a paused-clock current-thread runtime inside a `LocalSet`.
pub fn run_local<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime");
    tokio::task::LocalSet::new().block_on(&runtime, future)
}

/// Let spawned local tasks run (and the paused clock advance) for `ms`.
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
