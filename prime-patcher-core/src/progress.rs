//! Progress reporting.
//!
//! Engines report in bytes and files through [`EngineProgress`]; callers
//! receive fractions and status text through [`ProgressSink`]. The relay in
//! between turns each engine call, up to and including the flush, into one
//! sink notification. Completion (1.0) is only reported once the patched
//! image is in place.

/// One progress notification: how far along the run is, and what it is doing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub fraction: f64,
    pub status: String,
}

/// Receives progress notifications, in order, on the thread running the patch.
pub trait ProgressSink {
    fn notify(&mut self, fraction: f64, status: &str);
}

impl<F: FnMut(f64, &str)> ProgressSink for F {
    fn notify(&mut self, fraction: f64, status: &str) {
        self(fraction, status)
    }
}

/// A sink that keeps every event it is given.
#[derive(Debug, Clone, Default)]
pub struct ProgressCollector {
    events: Vec<ProgressEvent>,
}

impl ProgressCollector {
    pub fn new() -> ProgressCollector {
        ProgressCollector::default()
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&ProgressEvent> {
        self.events.last()
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }
}

impl ProgressSink for ProgressCollector {
    fn notify(&mut self, fraction: f64, status: &str) {
        self.events.push(ProgressEvent {
            fraction,
            status: status.to_string(),
        });
    }
}

/// What a patch engine reports while it writes the output image.
pub trait EngineProgress {
    fn notify_total_bytes(&mut self, total_size: u64);
    fn notify_writing_file(&mut self, file_name: &str, file_bytes: u64);
    fn notify_writing_header(&mut self);
    fn notify_flushing_to_disk(&mut self);
}

pub(crate) const DONE_STATUS: &str = "Done";

/// Highest fraction relayed on the engine's behalf. 1.0 is reserved for the
/// completion event, sent once the output image is in place.
const ENGINE_FRACTION_CAP: f64 = 0.99;

pub(crate) struct ProgressRelay<'s, S: ProgressSink + ?Sized> {
    sink: &'s mut S,
    total_bytes: u64,
    bytes_so_far: u64,
    last_fraction: f64,
    flushed: bool,
    finished: bool,
}

impl<'s, S: ProgressSink + ?Sized> ProgressRelay<'s, S> {
    pub(crate) fn new(sink: &'s mut S) -> Self {
        ProgressRelay {
            sink,
            total_bytes: 0,
            bytes_so_far: 0,
            last_fraction: 0.0,
            flushed: false,
            finished: false,
        }
    }

    fn current_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return self.last_fraction;
        }
        (self.bytes_so_far as f64 / self.total_bytes as f64).clamp(0.0, ENGINE_FRACTION_CAP)
    }

    fn emit(&mut self, fraction: f64, status: &str) {
        // Never report going backwards.
        let fraction = fraction.max(self.last_fraction);
        self.last_fraction = fraction;
        self.sink.notify(fraction, status);
    }

    /// Sends the completion event. Called only after the output is in place.
    pub(crate) fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.emit(1.0, DONE_STATUS);
        }
    }
}

// Once the engine has flushed, anything further it reports is dropped.
impl<'s, S: ProgressSink + ?Sized> EngineProgress for ProgressRelay<'s, S> {
    fn notify_total_bytes(&mut self, total_size: u64) {
        if self.flushed {
            return;
        }
        self.total_bytes = total_size;
        let fraction = self.current_fraction();
        self.emit(fraction, &format!("Preparing to write {} bytes", total_size));
    }

    fn notify_writing_file(&mut self, file_name: &str, file_bytes: u64) {
        if self.flushed {
            return;
        }
        let fraction = self.current_fraction();
        self.emit(fraction, &format!("Writing file {}", file_name));
        self.bytes_so_far = self.bytes_so_far.saturating_add(file_bytes);
    }

    fn notify_writing_header(&mut self) {
        if self.flushed {
            return;
        }
        let fraction = self.current_fraction();
        self.emit(fraction, "Writing ISO header");
    }

    fn notify_flushing_to_disk(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;
        let fraction = self.current_fraction();
        self.emit(fraction, "Flushing written data to the disk");
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineProgress, ProgressCollector, ProgressRelay, ProgressSink};

    fn fractions(collector: &ProgressCollector) -> Vec<f64> {
        collector.events().iter().map(|e| e.fraction).collect()
    }

    #[test]
    fn converts_bytes_to_fractions() {
        let mut collector = ProgressCollector::new();
        {
            let mut relay = ProgressRelay::new(&mut collector);
            relay.notify_total_bytes(400);
            relay.notify_writing_header();
            relay.notify_writing_file("Metroid1.pak", 100);
            relay.notify_writing_file("Metroid2.pak", 300);
            relay.notify_flushing_to_disk();
            relay.finish();
        }
        assert_eq!(fractions(&collector), vec![0.0, 0.0, 0.0, 0.25, 0.99, 1.0]);
        let statuses: Vec<&str> = collector.events().iter().map(|e| e.status.as_str()).collect();
        assert_eq!(
            statuses,
            vec![
                "Preparing to write 400 bytes",
                "Writing ISO header",
                "Writing file Metroid1.pak",
                "Writing file Metroid2.pak",
                "Flushing written data to the disk",
                "Done",
            ]
        );
    }

    #[test]
    fn flush_is_not_completion() {
        let mut collector = ProgressCollector::new();
        {
            let mut relay = ProgressRelay::new(&mut collector);
            relay.notify_total_bytes(10);
            relay.notify_writing_file("default.dol", 10);
            relay.notify_flushing_to_disk();
        }
        assert!(collector.events().iter().all(|e| e.fraction < 1.0));
    }

    #[test]
    fn calls_after_flush_are_dropped() {
        let mut collector = ProgressCollector::new();
        {
            let mut relay = ProgressRelay::new(&mut collector);
            relay.notify_total_bytes(10);
            relay.notify_flushing_to_disk();
            relay.notify_flushing_to_disk();
            relay.notify_writing_file("late.pak", 5);
            relay.notify_writing_header();
            relay.notify_total_bytes(20);
            relay.finish();
            relay.finish();
        }
        let statuses: Vec<&str> = collector.events().iter().map(|e| e.status.as_str()).collect();
        assert_eq!(
            statuses,
            vec!["Preparing to write 10 bytes", "Flushing written data to the disk", "Done"]
        );
        assert_eq!(
            collector.events().iter().filter(|e| e.fraction == 1.0).count(),
            1
        );
    }

    #[test]
    fn finish_adds_done_when_engine_is_silent() {
        let mut collector = ProgressCollector::new();
        ProgressRelay::new(&mut collector).finish();
        assert_eq!(collector.events().len(), 1);
        assert_eq!(collector.last().unwrap().fraction, 1.0);
        assert_eq!(collector.last().unwrap().status, "Done");
    }

    #[test]
    fn fractions_never_decrease() {
        let mut collector = ProgressCollector::new();
        {
            let mut relay = ProgressRelay::new(&mut collector);
            relay.notify_total_bytes(100);
            relay.notify_writing_file("a", 80);
            relay.notify_writing_file("b", 80);
            relay.notify_writing_file("c", 10);
            // A larger total would pull the ratio back down.
            relay.notify_total_bytes(1000);
            relay.notify_writing_header();
            relay.finish();
        }
        let seen = fractions(&collector);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |fraction: f64, status: &str| seen.push((fraction, status.to_string()));
            sink.notify(0.5, "half");
        }
        assert_eq!(seen, vec![(0.5, "half".to_string())]);
    }
}
