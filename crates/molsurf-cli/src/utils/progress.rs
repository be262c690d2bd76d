use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use molsurf::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

/// What is on screen for one surface run: a spinner for the current phase, swapped for a
/// slab counter while the lattice is walked.
struct PhaseDisplay {
    bar: ProgressBar,
    phase: Option<(&'static str, Instant)>,
    completed: Vec<String>,
}

impl PhaseDisplay {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.set_style(spinner_style());
        bar.finish_and_clear();
        Self {
            bar,
            phase: None,
            completed: Vec::new(),
        }
    }

    fn start_phase(&mut self, name: &'static str) {
        self.phase = Some((name, Instant::now()));
        self.bar.reset();
        self.bar.set_length(0);
        self.bar.set_style(spinner_style());
        self.bar.set_message(format!("{name}..."));
        self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    }

    fn finish_phase(&mut self) {
        self.bar.disable_steady_tick();
        let Some((name, started)) = self.phase.take() else {
            return;
        };
        let line = format!("✓ {name} ({:.2}s)", started.elapsed().as_secs_f64());
        self.bar.finish_and_clear();
        self.bar.println(&line);
        self.completed.push(line);
    }

    /// Switches to a bar counting x-slabs of lattice cells.
    fn start_slabs(&mut self, slabs: u64) {
        self.bar.disable_steady_tick();
        self.bar.reset();
        self.bar.set_length(slabs);
        self.bar.set_style(slab_style());
        if let Some((name, _)) = self.phase {
            self.bar.set_message(name);
        }
    }

    fn finish_slabs(&mut self) {
        if let Some(length) = self.bar.length() {
            self.bar.set_position(length);
        }
        if self.phase.is_some() {
            self.bar.set_style(spinner_style());
            self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        }
    }

    fn note(&self, message: String) {
        self.bar.println(format!("  {message}"));
    }

    fn handle(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => self.start_phase(name),
            Progress::PhaseFinish => self.finish_phase(),
            Progress::TaskStart { total_steps } => self.start_slabs(total_steps),
            Progress::TaskIncrement => self.bar.inc(1),
            Progress::TaskFinish => self.finish_slabs(),
            Progress::Message(message) => self.note(message),
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn slab_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<18} [{bar:36.cyan/blue}] slab {pos}/{len} {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders surface-generation progress on stderr and keeps a line per finished phase.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<PhaseDisplay>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self {
            display: Arc::new(Mutex::new(PhaseDisplay::new())),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let display = Arc::clone(&self.display);
        Box::new(move |progress: Progress| match display.lock() {
            Ok(mut display) => display.handle(progress),
            Err(_) => warn!("Progress display mutex was poisoned; dropping {:?}", progress),
        })
    }

    /// Timing lines of the phases finished so far.
    pub fn completed_phases(&self) -> Vec<String> {
        self.display
            .lock()
            .map(|display| display.completed.clone())
            .unwrap_or_default()
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
