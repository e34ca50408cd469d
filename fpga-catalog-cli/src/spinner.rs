//! Spinner showing the updater's current state.

use std::time::Duration;

use fpga_catalog_remote::UpdateState;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub(crate) struct StateSpinner {
    bar: ProgressBar,
}

impl StateSpinner {
    /// When `quiet` is true the spinner is never drawn.
    pub(crate) fn new(quiet: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("/-\\|");
        bar.set_style(style);
        Self { bar }
    }

    /// An updater observer that labels each state with `label`.
    pub(crate) fn observer(&self, label: String) -> impl FnMut(UpdateState) + 'static {
        let bar = self.bar.clone();
        move |state| match state {
            UpdateState::Idle => {
                bar.disable_steady_tick();
                bar.set_message("");
            }
            state => {
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_message(format!("{label}: {state}"));
            }
        }
    }

    pub(crate) fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for StateSpinner {
    fn drop(&mut self) {
        self.clear();
    }
}
