//! Hierarchical step tracking for pipeline progress
//!
//! A [`Tracker`] is an ordered list of named steps. Insertion order is display
//! order. Status transitions are not validated: a step simply shows whatever
//! was set last. Mutating a step that was never added registers it on the fly.
//!
//! An optional observer is invoked synchronously after every mutation, which
//! is how the CLI redraws the tree live. Observer failures are logged and
//! discarded; they never affect tracker state. An observer that panics is
//! detached.

use colored::Colorize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Error,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Done => "done",
            StepStatus::Error => "error",
            StepStatus::Skipped => "skipped",
        }
    }

    /// Circle glyph: filled once the step reached an outcome, hollow otherwise
    pub fn glyph(&self) -> &'static str {
        match self {
            StepStatus::Done | StepStatus::Error => "●",
            StepStatus::Pending | StepStatus::Running | StepStatus::Skipped => "○",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of observable progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub key: String,
    pub label: String,
    pub status: StepStatus,
    pub detail: String,
}

/// Callback run after every tracker mutation
pub type Observer = Box<dyn FnMut(&Tracker) -> anyhow::Result<()> + Send>;

/// Ordered record of steps with an optional observer
pub struct Tracker {
    title: String,
    steps: Vec<Step>,
    observer: Option<Observer>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("title", &self.title)
            .field("steps", &self.steps)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Tracker {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps: Vec::new(),
            observer: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, key: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.key == key)
    }

    /// Replace any previous observer
    pub fn attach_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    pub fn detach_observer(&mut self) -> Option<Observer> {
        self.observer.take()
    }

    /// Register a pending step; a no-op when the key already exists
    pub fn add(&mut self, key: &str, label: &str) {
        if self.get(key).is_some() {
            return;
        }
        self.steps.push(Step {
            key: key.to_string(),
            label: label.to_string(),
            status: StepStatus::Pending,
            detail: String::new(),
        });
        self.notify();
    }

    pub fn start(&mut self, key: &str, detail: Option<&str>) {
        self.update(key, StepStatus::Running, detail);
    }

    pub fn complete(&mut self, key: &str, detail: Option<&str>) {
        self.update(key, StepStatus::Done, detail);
    }

    pub fn error(&mut self, key: &str, detail: Option<&str>) {
        self.update(key, StepStatus::Error, detail);
    }

    pub fn skip(&mut self, key: &str, detail: Option<&str>) {
        self.update(key, StepStatus::Skipped, detail);
    }

    fn update(&mut self, key: &str, status: StepStatus, detail: Option<&str>) {
        match self.steps.iter_mut().find(|s| s.key == key) {
            Some(step) => {
                step.status = status;
                if let Some(detail) = detail {
                    step.detail = detail.to_string();
                }
            }
            None => self.steps.push(Step {
                key: key.to_string(),
                label: key.to_string(),
                status,
                detail: detail.unwrap_or_default().to_string(),
            }),
        }
        self.notify();
    }

    fn notify(&mut self) {
        let Some(mut observer) = self.observer.take() else {
            return;
        };
        let tracker: &Tracker = self;
        match panic::catch_unwind(AssertUnwindSafe(|| observer(tracker))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "progress observer failed"),
            Err(_) => {
                tracing::warn!("progress observer panicked; detaching it");
                return;
            }
        }
        self.observer = Some(observer);
    }

    /// Read-only, order-preserving view of the current state
    pub fn render(&self) -> Render<'_> {
        Render {
            title: &self.title,
            steps: &self.steps,
        }
    }
}

/// Tree view of a tracker, displayed with status glyphs
#[derive(Debug, Clone, Copy)]
pub struct Render<'a> {
    title: &'a str,
    steps: &'a [Step],
}

impl<'a> Render<'a> {
    pub fn steps(&self) -> &'a [Step] {
        self.steps
    }

    fn styled_glyph(status: StepStatus) -> String {
        let glyph = status.glyph();
        match status {
            StepStatus::Done => glyph.green().to_string(),
            StepStatus::Pending => glyph.green().dimmed().to_string(),
            StepStatus::Running => glyph.cyan().to_string(),
            StepStatus::Error => glyph.red().to_string(),
            StepStatus::Skipped => glyph.yellow().to_string(),
        }
    }
}

impl fmt::Display for Render<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title.cyan().bold())?;
        for (i, step) in self.steps.iter().enumerate() {
            let guide = if i + 1 == self.steps.len() {
                "└── "
            } else {
                "├── "
            };
            let detail = step.detail.trim();
            let glyph = Self::styled_glyph(step.status);

            // Pending lines are dimmed as a whole; others keep the label bright
            let line = match (step.status, detail.is_empty()) {
                (StepStatus::Pending, true) => format!("{} {}", glyph, step.label.bright_black()),
                (StepStatus::Pending, false) => format!(
                    "{} {}",
                    glyph,
                    format!("{} ({})", step.label, detail).bright_black()
                ),
                (_, true) => format!("{} {}", glyph, step.label.white()),
                (_, false) => format!(
                    "{} {} {}",
                    glyph,
                    step.label.white(),
                    format!("({})", detail).bright_black()
                ),
            };
            write!(f, "\n{}{}", guide.bright_black(), line)?;
        }
        Ok(())
    }
}
