use std::io::Write;

use anyhow::Context;

use crate::ir::ProgressEvent;

/// Receiver of progress events. Returning an error tells the pipeline the
/// caller has gone away.
pub trait ProgressSink {
    fn emit(&mut self, event: &ProgressEvent) -> anyhow::Result<()>;
}

/// Newline-delimited JSON, flushed per event. Nothing is written after the
/// first terminal event.
pub struct NdjsonSink<W: Write> {
    out: W,
    closed: bool,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for NdjsonSink<W> {
    fn emit(&mut self, event: &ProgressEvent) -> anyhow::Result<()> {
        if self.closed {
            return Err(anyhow::anyhow!("stream already terminated"));
        }
        let line = serde_json::to_string(event).context("serialize progress event")?;
        self.out
            .write_all(line.as_bytes())
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush())
            .context("write progress event")?;
        if event.is_terminal() {
            self.closed = true;
        }
        Ok(())
    }
}

pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&mut self, _event: &ProgressEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Keeps events in memory; optionally starts refusing them after `limit`.
#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<ProgressEvent>,
    limit: Option<usize>,
}

impl CollectingSink {
    pub fn failing_after(limit: usize) -> Self {
        Self {
            events: Vec::new(),
            limit: Some(limit),
        }
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&mut self, event: &ProgressEvent) -> anyhow::Result<()> {
        if self.limit.is_some_and(|l| self.events.len() >= l) {
            return Err(anyhow::anyhow!("receiver closed"));
        }
        self.events.push(event.clone());
        Ok(())
    }
}
