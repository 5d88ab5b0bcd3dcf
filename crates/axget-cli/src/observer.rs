use std::cell::{Cell, RefCell};

use axget_core::{InstallObserver, Stage};
use indicatif::ProgressBar;

use crate::output::Output;
use crate::progress::{format_bytes, ProgressManager};

/// Shows pipeline progress on the terminal.
pub struct TerminalObserver<'a> {
    output: &'a Output,
    progress: &'a ProgressManager,
    bar: RefCell<Option<ProgressBar>>,
    spinner: RefCell<Option<ProgressBar>>,
    downloaded: Cell<u64>,
}

impl<'a> TerminalObserver<'a> {
    pub fn new(output: &'a Output, progress: &'a ProgressManager) -> Self {
        Self {
            output,
            progress,
            bar: RefCell::new(None),
            spinner: RefCell::new(None),
            downloaded: Cell::new(0),
        }
    }

    fn clear_spinner(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }
}

impl InstallObserver for TerminalObserver<'_> {
    fn stage(&self, stage: Stage) {
        self.clear_spinner();
        match stage {
            Stage::Extracting | Stage::Assembling | Stage::OwnershipRepair => {
                let message = format!("{}...", capitalize(&stage.to_string()));
                *self.spinner.borrow_mut() = Some(self.progress.create_spinner(&message));
            }
            Stage::Done => {}
            _ => self.output.verbose(&format!("Stage: {}", stage)),
        }
    }

    fn download_started(&self, label: &str, url: &str) {
        self.output.info(&format!("Downloading {}", label));
        self.output.verbose(&format!("  from {}", url));
        self.downloaded.set(0);
        *self.bar.borrow_mut() = Some(self.progress.create_download_bar(label, 0));
    }

    fn download_progress(&self, downloaded: u64, total: u64) {
        self.downloaded.set(downloaded);
        if let Some(bar) = self.bar.borrow().as_ref() {
            if total > 0 && bar.length() != Some(total) {
                bar.set_length(total);
            }
            bar.set_position(downloaded);
        }
    }

    fn download_finished(&self, label: &str) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
        self.output.verbose(&format!(
            "Downloaded {} ({})",
            label,
            format_bytes(self.downloaded.get())
        ));
    }

    fn warning(&self, message: &str) {
        self.clear_spinner();
        self.output.warning(message);
    }
}

impl Drop for TerminalObserver<'_> {
    fn drop(&mut self) {
        self.clear_spinner();
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
