//! Run a small localization batch and print the results table.
//!
//! ```bash
//! cargo run --example batch_run -p echoloc-sim
//! ```

use echoloc_core::waveform::Waveform;
use echoloc_sim::runner::{RunnerConfig, TrialRunner};

fn main() {
    let waveform = Waveform::chirp(200.0, 2000.0, 0.05).expect("chirp parameters are valid");
    let config = RunnerConfig {
        trials: 20,
        sensors: 8,
        workers: 4,
        seed: Some(42),
        ..Default::default()
    };

    let mut runner = TrialRunner::new(config, waveform).expect("config is valid");
    let report = runner.run().expect("run completes");

    print!("{}", report.format_text());
}
