//! Frame driver.
//!
//! Stands in for the host's animation-frame and timer callbacks: a frame
//! interval collects mutations and flushes, a slower sweep interval runs the
//! scheduler's sweep. Runs on a current-thread runtime; the scheduler is
//! shared as `Rc<RefCell<_>>` and never borrowed across an `.await`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;
use web_time::Instant;

use crate::scheduler::{FlushReport, Scheduler};

#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    pub frame_interval: Duration,
    pub sweep_interval: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// Totals over a driver run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    pub flushes: usize,
    pub sweeps: usize,
    pub totals: FlushReport,
}

impl DriverStats {
    fn record(&mut self, report: &FlushReport) {
        self.flushes += 1;
        self.totals.roots += report.roots;
        self.totals.math_spans += report.math_spans;
        self.totals.diagrams += report.diagrams;
        self.totals.copy_buttons += report.copy_buttons;
        self.totals.errors += report.errors;
        self.totals.evicted += report.evicted;
    }
}

/// Drive `scheduler` until `shutdown` fires, then unbind it.
pub async fn run(
    scheduler: Rc<RefCell<Scheduler>>,
    options: DriverOptions,
    mut shutdown: oneshot::Receiver<()>,
) -> DriverStats {
    let mut frame = interval(options.frame_interval);
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sweep = interval(options.sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stats = DriverStats::default();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = frame.tick() => {
                let flush = {
                    let mut scheduler = scheduler.borrow_mut();
                    scheduler.collect();
                    scheduler.take_frame()
                };
                if let Some(flush) = flush {
                    let report = flush.run().await;
                    stats.record(&report);
                }
            }
            _ = sweep.tick() => {
                scheduler.borrow_mut().sweep(Instant::now());
                stats.sweeps += 1;
            }
        }
    }

    scheduler.borrow_mut().unbind();
    debug!(flushes = stats.flushes, sweeps = stats.sweeps, "driver stopped");
    stats
}

/// Flush repeatedly until no frame is requested, at most `max_frames`
/// times. Returns the report of every flush that ran.
pub async fn run_until_idle(scheduler: &Rc<RefCell<Scheduler>>, max_frames: usize) -> Vec<FlushReport> {
    let mut reports = Vec::new();
    while reports.len() < max_frames {
        let flush = {
            let mut scheduler = scheduler.borrow_mut();
            scheduler.collect();
            scheduler.take_frame()
        };
        let Some(flush) = flush else {
            break;
        };
        reports.push(flush.run().await);
    }
    reports
}
