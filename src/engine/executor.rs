//! Terminal side of execution: progress bars, confirmation, summary

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, ExecuteSummary, ProgressCallback};
use dialoguer::Confirm;
use indicatif::ProgressBar;

use crate::progress;
use crate::ui;

/// Reports each stage with a progress bar
pub struct BarProgress {
    bar: Option<ProgressBar>,
    verbose: bool,
    quiet: bool,
}

impl BarProgress {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bar: None,
            verbose,
            quiet,
        }
    }

    // Print above the bar instead of through it
    fn print(&self, f: impl FnOnce()) {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize, stage: &str) {
        self.bar = Some(if self.quiet {
            ProgressBar::hidden()
        } else {
            progress::bar(count, stage)
        });
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(id.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        match result {
            ApplyResult::Failed { error } => {
                self.print(|| ui::error(&format!("{id}: {error}")));
            }
            ApplyResult::Invalid { violations } => self.print(|| {
                ui::error(&format!("{id} is invalid, nothing was sent"));
                for violation in violations {
                    ui::dim(&violation.to_string());
                }
            }),
            ApplyResult::Skipped { reason } if self.verbose => {
                self.print(|| ui::dim(&format!("{id}: skipped ({reason})")));
            }
            done if self.verbose && done.is_change() => {
                self.print(|| println!("    {} {id}", "✓".green()));
            }
            _ => {}
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Asks on the terminal unless `--yes` was given
pub struct PromptConfirm {
    pub yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.removed, "removed"),
        (summary.no_change, "already up to date"),
        (summary.skipped, "skipped"),
    ];
    for (count, what) in lines {
        if count > 0 {
            println!("    • {} {what}", ui::plural(count, "resource"));
        }
    }
    if summary.invalid > 0 {
        println!("    • {} {}", ui::plural(summary.invalid, "resource"), "invalid".red());
    }
    if summary.failed > 0 {
        println!("    • {} {}", ui::plural(summary.failed, "resource"), "failed".red());
    }
}
