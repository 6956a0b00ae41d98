use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wfc_core::{ProgressCallback, ProgressInfo, RunSummary, SolverState, WfcError};

/// Trait for reporting the progress of a solver run.
///
/// Implementors of this trait can display progress information in various ways
/// (console output, a status file, ...).
pub trait ProgressReporter: Send + Sync {
    /// Called after every solver iteration with updated progress information.
    ///
    /// # Arguments
    ///
    /// * `info` - The latest `ProgressInfo` snapshot from the solver.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if reporting was successful.
    /// * `Err(anyhow::Error)` if an error occurred during reporting.
    fn report(&mut self, info: &ProgressInfo) -> Result<()>;

    /// Called when the run finishes, solved or contradicted.
    fn finish(&mut self, summary: &RunSummary) -> Result<()>;

    /// Called when the run fails with an error.
    fn fail(&mut self, error: &WfcError) -> Result<()>;
}

/// A `ProgressReporter` that logs throttled status lines.
pub struct ConsoleProgressReporter {
    start_time: Instant,
    last_report_time: Option<Instant>,
    report_interval: Duration,
    reports: u64,
}

impl ConsoleProgressReporter {
    /// Creates a new `ConsoleProgressReporter`.
    ///
    /// # Arguments
    ///
    /// * `report_interval` - The minimum time that must elapse between progress reports.
    pub fn new(report_interval: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            last_report_time: None,
            report_interval,
            reports: 0,
        }
    }

    /// Number of status lines emitted so far.
    pub fn reports(&self) -> u64 {
        self.reports
    }

    fn format_duration(duration: Duration) -> String {
        format!("{}.{:03}s", duration.as_secs(), duration.subsec_millis())
    }

    fn due(&self, now: Instant) -> bool {
        self.last_report_time
            .map_or(true, |last| now.duration_since(last) >= self.report_interval)
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report(&mut self, info: &ProgressInfo) -> Result<()> {
        let now = Instant::now();
        if !self.due(now) {
            return Ok(());
        }

        let percentage = if info.total_cells > 0 {
            (info.collapsed_cells as f64 / info.total_cells as f64) * 100.0
        } else {
            100.0
        };

        let eta_str = if info.collapsed_cells > 0 && info.collapsed_cells < info.total_cells {
            let time_per_cell = info.elapsed_time.as_secs_f64() / info.collapsed_cells as f64;
            let remaining_cells = info.total_cells - info.collapsed_cells;
            format!(
                " | ETA: {}",
                Self::format_duration(Duration::from_secs_f64(time_per_cell * remaining_cells as f64))
            )
        } else {
            " | ETA: N/A".to_string()
        };

        log::info!(
            "Progress: Iter: {} | Decided: {}/{} ({:.1}%) | Contradicted: {} | Elapsed: {}{}",
            info.iterations,
            info.collapsed_cells,
            info.total_cells,
            percentage,
            info.contradicted_cells,
            Self::format_duration(info.elapsed_time),
            eta_str
        );

        self.last_report_time = Some(now);
        self.reports += 1;
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        let total_time = Self::format_duration(self.start_time.elapsed());
        match summary.state {
            SolverState::Contradicted => log::warn!(
                "Run finished with {} contradicted cells. Total time: {}",
                summary.contradicted_cells.len(),
                total_time
            ),
            _ => log::info!("Run finished successfully. Total time: {total_time}"),
        }
        Ok(())
    }

    fn fail(&mut self, error: &WfcError) -> Result<()> {
        log::error!(
            "Run failed: {}. Total time: {}",
            error,
            Self::format_duration(self.start_time.elapsed())
        );
        Ok(())
    }
}

/// Shared handle to a reporter, usable from the solver thread and the caller.
pub type SharedReporter = Arc<Mutex<dyn ProgressReporter>>;

/// Wraps a shared reporter in a solver progress callback.
pub fn progress_callback(reporter: SharedReporter) -> ProgressCallback {
    Box::new(move |info: ProgressInfo| {
        let mut guard = reporter
            .lock()
            .map_err(|_| WfcError::InternalError("progress reporter lock poisoned".into()))?;
        guard
            .report(&info)
            .map_err(|e| WfcError::InternalError(format!("progress reporting failed: {e}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn info(iterations: u64, collapsed_cells: usize, total_cells: usize) -> ProgressInfo {
        ProgressInfo {
            collapsed_cells,
            total_cells,
            contradicted_cells: 0,
            elapsed_time: Duration::from_millis(iterations * 10),
            iterations,
        }
    }

    #[test]
    fn test_console_reporter_throttles() {
        let mut reporter = ConsoleProgressReporter::new(Duration::from_millis(50));
        reporter.report(&info(10, 50, 1000)).unwrap();
        assert_eq!(reporter.reports(), 1);

        // Second report immediately after should be throttled
        reporter.report(&info(11, 55, 1000)).unwrap();
        assert_eq!(reporter.reports(), 1);

        thread::sleep(Duration::from_millis(60));
        reporter.report(&info(20, 100, 1000)).unwrap();
        assert_eq!(reporter.reports(), 2);
    }

    #[test]
    fn test_console_reporter_zero_cells() {
        let mut reporter = ConsoleProgressReporter::new(Duration::from_millis(50));
        assert!(reporter.report(&info(0, 0, 0)).is_ok());
    }

    #[test]
    fn test_callback_forwards_to_reporter() {
        let reporter = Arc::new(Mutex::new(ConsoleProgressReporter::new(Duration::ZERO)));
        let callback = progress_callback(reporter.clone());
        callback(info(1, 1, 4)).unwrap();
        callback(info(2, 4, 4)).unwrap();
        assert_eq!(reporter.lock().unwrap().reports(), 2);
    }
}
