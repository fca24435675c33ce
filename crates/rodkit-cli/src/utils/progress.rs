use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rodkit::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use tracing::warn;

const FRAME_BAR_TEMPLATE: &str =
    "{msg:<34} [{bar:30.cyan/blue}] {pos:>6}/{len:<6} frames {elapsed:>4}";
const PHASE_TEMPLATE: &str = "» {msg}";

/// Terminal view of an analysis run.
///
/// Workflow phases ("Equipartition", "Persistence Length", "RMSD") appear as a
/// header line; the per-frame tasks inside them ("Stretch energy",
/// "Aligning frame", ...) drive a frame counter under that header.
#[derive(Clone)]
pub struct FrameProgress {
    view: Arc<Mutex<View>>,
}

struct View {
    bar: ProgressBar,
    phase: Option<&'static str>,
    task: Option<&'static str>,
}

impl FrameProgress {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.finish_and_clear();
        Self {
            view: Arc::new(Mutex::new(View {
                bar,
                phase: None,
                task: None,
            })),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let view = self.view.clone();
        Box::new(move |event: Progress| match view.lock() {
            Ok(mut view) => view.apply(event),
            Err(_) => warn!("Progress display lock was poisoned; dropping {:?}.", event),
        })
    }
}

impl Default for FrameProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl View {
    fn apply(&mut self, event: Progress) {
        match event {
            Progress::PhaseStart { name } => {
                self.phase = Some(name);
                self.show_phase(name);
            }
            Progress::PhaseFinish => {
                if let Some(name) = self.phase.take() {
                    self.bar.println(format!("✓ {}", name));
                }
                self.bar.finish_and_clear();
            }
            Progress::TaskStart { label, total_steps } => {
                self.task = Some(label);
                self.bar.reset();
                self.bar.set_style(frame_style());
                self.bar.set_length(total_steps);
                self.bar.set_message(task_message(self.phase, label));
            }
            Progress::TaskIncrement { steps } => self.bar.inc(steps),
            Progress::TaskFinish => {
                let frames = self.bar.length().unwrap_or(0);
                self.bar.set_position(frames);
                let label = self.task.take();
                match self.phase {
                    Some(phase) => self.show_phase(phase),
                    None => {
                        if let Some(label) = label {
                            self.bar.println(format!("✓ {} ({} frames)", label, frames));
                        }
                        self.bar.finish_and_clear();
                    }
                }
            }
            Progress::Message(msg) => self.bar.println(format!("  {}", msg)),
        }
    }

    fn show_phase(&self, name: &'static str) {
        self.bar.reset();
        self.bar.set_length(0);
        self.bar.set_style(phase_style());
        self.bar.set_message(name);
        self.bar.tick();
    }
}

/// Bar caption for a task, prefixed with its workflow phase when there is one.
fn task_message(phase: Option<&str>, label: &str) -> String {
    match phase {
        Some(phase) => format!("{} · {}", phase, label),
        None => label.to_string(),
    }
}

fn phase_style() -> ProgressStyle {
    ProgressStyle::with_template(PHASE_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn frame_style() -> ProgressStyle {
    ProgressStyle::with_template(FRAME_BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hidden() -> FrameProgress {
        FrameProgress::with_target(ProgressDrawTarget::hidden())
    }

    fn bar_state(progress: &FrameProgress) -> (String, Option<u64>, u64, bool) {
        let view = progress.view.lock().unwrap();
        (
            view.bar.message(),
            view.bar.length(),
            view.bar.position(),
            view.bar.is_finished(),
        )
    }

    #[test]
    fn task_captions_carry_the_phase() {
        assert_eq!(task_message(Some("Equipartition"), "Stretch energy"), "Equipartition · Stretch energy");
        assert_eq!(task_message(None, "Aligning frame"), "Aligning frame");
    }

    #[test]
    fn display_starts_idle() {
        let (_, length, _, finished) = bar_state(&hidden());
        assert_eq!(length, Some(0));
        assert!(finished);
    }

    #[test]
    fn tasks_inside_a_phase_count_frames_then_return_to_the_phase() {
        let progress = hidden();
        let callback = progress.callback();

        callback(Progress::PhaseStart { name: "Equipartition" });
        assert_eq!(bar_state(&progress).0, "Equipartition");
        assert!(!bar_state(&progress).3);

        callback(Progress::TaskStart {
            label: "Stretch energy",
            total_steps: 40,
        });
        callback(Progress::TaskIncrement { steps: 1 });
        callback(Progress::TaskIncrement { steps: 1 });
        let (message, length, position, _) = bar_state(&progress);
        assert_eq!(message, "Equipartition · Stretch energy");
        assert_eq!(length, Some(40));
        assert_eq!(position, 2);

        callback(Progress::TaskFinish);
        let (message, length, _, finished) = bar_state(&progress);
        assert_eq!(message, "Equipartition");
        assert_eq!(length, Some(0));
        assert!(!finished);

        callback(Progress::PhaseFinish);
        assert!(bar_state(&progress).3);
        assert!(progress.view.lock().unwrap().phase.is_none());
    }

    #[test]
    fn standalone_alignment_finishes_the_bar() {
        let progress = hidden();
        let callback = progress.callback();
        callback(Progress::TaskStart {
            label: "Aligning frame",
            total_steps: 5,
        });
        assert_eq!(bar_state(&progress).0, "Aligning frame");
        callback(Progress::TaskIncrement { steps: 3 });
        callback(Progress::TaskFinish);
        let (_, length, position, finished) = bar_state(&progress);
        assert_eq!(position, length.unwrap());
        assert_eq!(position, 5);
        assert!(finished);
    }

    #[test]
    fn events_from_worker_threads_reach_the_display() {
        let progress = hidden();
        let callback = progress.callback();
        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "RMSD" });
            callback(Progress::TaskStart {
                label: "Aligning frame",
                total_steps: 2,
            });
            callback(Progress::TaskIncrement { steps: 2 });
        })
        .join()
        .unwrap();
        let (message, _, position, _) = bar_state(&progress);
        assert_eq!(message, "RMSD · Aligning frame");
        assert_eq!(position, 2);
    }
}
