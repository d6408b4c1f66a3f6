use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use console::style;
use crate::pipeline::{RunEvent, RunPhase};

/// Progress bars for a local run, driven by `RunEvent`s.
pub struct RunProgressDisplay {
    multi: MultiProgress,
    partition_bar: Option<ProgressBar>,
    status_bar: ProgressBar,
    failed: usize,
    start_time: std::time::Instant,
}

impl RunProgressDisplay {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status_bar = multi.add(ProgressBar::new_spinner());
        status_bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        );
        status_bar.set_message("Preparing analysis...");
        status_bar.enable_steady_tick(std::time::Duration::from_millis(120));

        Self {
            multi,
            partition_bar: None,
            status_bar,
            failed: 0,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { partitions, .. } => {
                let bar = self.multi.insert_before(&self.status_bar, ProgressBar::new(*partitions as u64));
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("  {bar:30.cyan/dark_gray} {pos}/{len} partitions | {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░")
                );
                self.partition_bar = Some(bar);
                self.update_status();
            }
            RunEvent::PhaseStarted { phase, display_name } => {
                if *phase != RunPhase::Collecting {
                    self.status_bar.set_message(format!("{}...", display_name));
                }
            }
            RunEvent::PartitionCompleted { partition, success, failure } => {
                if let Some(bar) = &self.partition_bar {
                    bar.inc(1);
                    bar.set_message(partition.clone());
                }
                if !success {
                    self.failed += 1;
                    let kind = failure.map(|k| k.to_string()).unwrap_or_else(|| "unknown".into());
                    self.println(&format!("  {} {} failed ({})", style("✗").red(), partition, kind));
                }
                self.update_status();
            }
            RunEvent::RunCompleted { status, total_cost, partitions_failed, duration_ms, .. } => {
                if let Some(bar) = self.partition_bar.take() {
                    bar.finish_with_message("done");
                }
                self.status_bar.finish_with_message(format!(
                    "Analysis {}: total {} | {} failed partitions | {}",
                    status,
                    total_cost.round_dp(2),
                    partitions_failed,
                    format_elapsed(*duration_ms),
                ));
            }
            RunEvent::RunFailed { status, error } => {
                if let Some(bar) = self.partition_bar.take() {
                    bar.abandon_with_message("stopped");
                }
                self.status_bar.finish_with_message(format!("Analysis {}: {}", status, error));
            }
            RunEvent::PhaseCompleted { .. } => {}
        }
    }

    fn update_status(&self) {
        self.status_bar.set_message(format!(
            "Collecting | {} | {} failed",
            format_elapsed(self.start_time.elapsed().as_millis() as u64),
            self.failed,
        ));
    }

    /// Print a line above the bars without tearing them.
    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

impl Default for RunProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_elapsed(ms: u64) -> String {
    let secs = ms / 1000;
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    if mins > 0 {
        format!("{}m{}s", mins, remaining_secs)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", ms)
    }
}
