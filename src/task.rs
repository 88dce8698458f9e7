use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, waking early once cancelled. Returns `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    Continue,
    Stop,
}

/// A named thread that runs `step` every `interval`. The next wait only starts
/// after the previous step returned, so steps never overlap. Dropping the handle
/// cancels the pending wait without joining.
pub struct RecurringTask {
    name: String,
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl RecurringTask {
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut step: F) -> Result<Self>
    where
        F: FnMut() -> TaskControl + Send + 'static,
    {
        let name = name.into();
        let token = CancelToken::new();
        let worker_token = token.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while !worker_token.is_cancelled() {
                    if step() == TaskControl::Stop {
                        break;
                    }
                    if !worker_token.sleep(interval) {
                        break;
                    }
                }
            })
            .with_context(|| format!("spawn task {name}"))?;
        Ok(Self {
            name,
            token,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Cancels and waits for the current step to return.
    pub fn join(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RecurringTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
