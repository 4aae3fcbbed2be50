use coulong::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;
const PASS_TEMPLATE: &str = "{prefix:>10} [{bar:40.cyan/blue}] pass {pos}/{len} {msg} ({elapsed})";

/// Renders engine progress events on a single shared bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::on(ProgressDrawTarget::stderr())
    }

    /// Tracks progress without drawing, for `--quiet` runs.
    pub fn hidden() -> Self {
        Self::on(ProgressDrawTarget::hidden())
    }

    fn on(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        pb.finish_and_clear();
        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();
        Box::new(move |event: Progress| match pb.lock() {
            Ok(guard) => apply(&guard, event),
            Err(_) => warn!("Progress bar mutex was poisoned; dropping progress event."),
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(pb: &ProgressBar, event: Progress) {
    match event {
        Progress::PhaseStart { name } => {
            pb.reset();
            pb.set_length(0);
            pb.set_style(spinner_style());
            pb.set_message(name);
            pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        }
        Progress::PhaseFinish => {
            pb.disable_steady_tick();
            pb.finish_with_message(format!("{} ✓", pb.message()));
        }
        Progress::PassesStart { total } => {
            pb.disable_steady_tick();
            pb.reset();
            pb.set_style(pass_style());
            pb.set_prefix("Evaluating");
            pb.set_length(total);
            pb.set_message("");
        }
        Progress::PassFinish { index, ecoul } => {
            pb.set_position(index as u64 + 1);
            pb.set_message(format!("E = {ecoul:.6}"));
        }
        Progress::PassesFinish => {
            if let Some(len) = pb.length() {
                pb.set_position(len);
            }
            pb.finish();
        }
        Progress::Message(text) if pb.is_finished() => pb.set_message(text),
        Progress::Message(text) => pb.println(format!("  {text}")),
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn pass_style() -> ProgressStyle {
    ProgressStyle::with_template(PASS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}
