//! # Console Collaborators
//!
//! A [`SurfaceRenderer`] and a [`Notifier`] that describe what a browser
//! would display as lines of text. Every line is kept in a [`Transcript`];
//! unless quiet, it is also printed.

use async_trait::async_trait;
use bindery_core::{ElementRef, Notifier, Settings, SurfaceRenderer};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, ordered record of console output.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Rc<RefCell<Vec<String>>>,
    echo: bool,
}

impl Transcript {
    /// A transcript that also prints each line when `echo` is set.
    #[must_use]
    pub fn new(echo: bool) -> Self {
        Self {
            lines: Rc::default(),
            echo,
        }
    }

    pub fn push(&self, line: String) {
        if self.echo {
            println!("  {line}");
        }
        self.lines.borrow_mut().push(line);
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

fn label(element: &ElementRef) -> String {
    element
        .id()
        .or_else(|| element.name())
        .unwrap_or_else(|| "<anonymous>".to_string())
}

// =============================================================================
// RENDERER
// =============================================================================

/// Writes surface changes to the transcript.
#[derive(Debug, Clone)]
pub struct ConsoleRenderer {
    transcript: Transcript,
}

impl ConsoleRenderer {
    #[must_use]
    pub fn new(transcript: Transcript) -> Self {
        Self { transcript }
    }
}

impl SurfaceRenderer for ConsoleRenderer {
    fn open_modal(&self, element: &ElementRef) {
        self.transcript.push(format!("modal open: {}", label(element)));
    }

    fn close_modals(&self) {
        self.transcript.push("modals closed".into());
    }

    fn show_interface(&self, element: &ElementRef) {
        self.transcript.push(format!("interface shown: {}", label(element)));
    }

    fn hide_interfaces(&self) {
        self.transcript.push("interfaces hidden".into());
    }

    fn fill_text(&self, element: &ElementRef, slot: &str, text: &str) {
        self.transcript
            .push(format!("{}.{slot} = {text}", label(element)));
    }

    fn fill_list(&self, element: &ElementRef, slot: &str, items: &[String]) {
        self.transcript
            .push(format!("{}.{slot} = [{}]", label(element), items.join(", ")));
    }
}

// =============================================================================
// NOTIFIER
// =============================================================================

/// Writes messages and lock changes to the transcript, tagged with the
/// configured message classes.
#[derive(Debug, Clone)]
pub struct ConsoleNotifier {
    transcript: Transcript,
    information: String,
    important: String,
    loading: String,
}

impl ConsoleNotifier {
    #[must_use]
    pub fn new(transcript: Transcript, settings: &Settings) -> Self {
        Self {
            transcript,
            information: settings.messages.information.clone(),
            important: settings.messages.important.clone(),
            loading: settings.loading.message.clone(),
        }
    }
}

#[async_trait(?Send)]
impl Notifier for ConsoleNotifier {
    fn show_message(&self, text: &str, important: bool) {
        let class = if important { &self.important } else { &self.information };
        self.transcript.push(format!("[{class}] {text}"));
    }

    fn show_error(&self, text: &str) {
        self.transcript.push(format!("[{}] {text}", self.important));
    }

    async fn hide_message(&self) {
        self.transcript.push("message hidden".into());
    }

    fn show_loading(&self) {
        self.transcript.push(format!("lock: {}", self.loading));
    }

    async fn hide_loading(&self) {
        self.transcript.push("lock released".into());
    }
}

// =============================================================================
// TESTS
// =============================================================================
