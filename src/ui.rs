//! Terminal output for the worker — spinner while a job is in flight,
//! colored status lines when it settles.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::job::{Job, JobStatus};

pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    pub fn start(job_id: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("processing {job_id}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finishes the spinner with a line matching the job's terminal state.
    pub fn complete(&self, job: &Job) {
        self.pb.finish_and_clear();
        match job.status {
            JobStatus::Completed => {
                let total = job.total_duration_seconds.unwrap_or(0.0);
                println!(
                    "  {} {} completed in {total:.2}s of stage time",
                    self.green.apply_to("✓"),
                    job.id
                );
            }
            JobStatus::Failed => {
                println!(
                    "  {} {} failed: {}",
                    self.red.apply_to("✗"),
                    job.id,
                    job.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            _ => {
                println!(
                    "  {} {} skipped (already {})",
                    self.yellow.apply_to("−"),
                    job.id,
                    job.status
                );
            }
        }
    }

    /// Finishes the spinner with an infrastructure error line.
    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }
}

/// Prints the full job record as pretty JSON.
pub fn print_record(job: &Job) {
    let style = match job.status {
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Failed => Style::new().red().bold(),
        _ => Style::new().yellow(),
    };
    println!();
    println!("{}", style.apply_to(format!("─── Job {} ───", job.id)));
    println!("{}", serde_json::to_string_pretty(job).unwrap_or_default());
}
