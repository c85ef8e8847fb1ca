use std::collections::VecDeque;

use parking_lot::Mutex;

/// Receives the full text collected so far, replacing whatever it showed before.
pub trait TextSink: Send + Sync {
    fn replace_text(&self, text: &str);
}

impl<F> TextSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn replace_text(&self, text: &str) {
        self(text)
    }
}

/// Append-only line buffer shared by a writer thread and a flusher thread.
///
/// Writers only touch `pending`. The flusher moves pending lines into the
/// window, which keeps at most `capacity` lines (0 means no limit).
#[derive(Debug, Default)]
pub struct RecordBuffer {
    pending: Mutex<Vec<String>>,
    window: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RecordBuffer {
            capacity,
            ..Default::default()
        }
    }

    pub fn append(&self, line: String) {
        self.pending.lock().push(line);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Moves pending lines into the window and returns the new window content,
    /// or `None` when nothing was appended since the previous call.
    pub fn drain(&self) -> Option<String> {
        let drained = std::mem::take(&mut *self.pending.lock());
        if drained.is_empty() {
            return None;
        }
        let mut window = self.window.lock();
        window.extend(drained);
        if self.capacity > 0 {
            while window.len() > self.capacity {
                window.pop_front();
            }
        }
        Some(window.iter().map(String::as_str).collect())
    }

    /// Window content, without draining pending lines.
    pub fn content(&self) -> String {
        self.window.lock().iter().map(String::as_str).collect()
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
        self.window.lock().clear();
    }
}
