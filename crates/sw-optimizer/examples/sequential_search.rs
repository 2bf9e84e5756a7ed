use std::cell::RefCell;

use sw_optimizer::{OptimizerOptions, Sequencer, SequencerConfig};
use sw_types::{FlagDeclarations, FlagValue, RandomState, SwResult, TrialRecord};

/// Toy training loss with its minimum near lr = 0.02, layers = 3.
fn train(lr: f64, layers: i64, optimizer: &str) -> f64 {
    let penalty = if optimizer == "adam" { 0.0 } else { 0.05 };
    (lr.ln() - 0.02_f64.ln()).powi(2) * 0.1 + ((layers - 3) as f64).powi(2) * 0.02 + penalty
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Stepwise sequential search example");

    let flags: FlagDeclarations = serde_json::from_str(
        r#"{
            "lr": "loguniform[1e-4:1e-1]",
            "layers": "[1:6]",
            "optimizer": ["sgd", "adam", "rmsprop"],
            "batch_size": 64
        }"#,
    )?;

    let config = SequencerConfig::default()
        .with_random_starts(3)
        .with_options(OptimizerOptions::default().with_n_points(2_000));
    let sequencer = Sequencer::new(flags, config)?;

    let runs: RefCell<Vec<TrialRecord>> = RefCell::new(Vec::new());
    let prior = || -> SwResult<Vec<TrialRecord>> { Ok(runs.borrow().clone()) };

    // The token is persisted as a string between trials, as a real
    // orchestrator would store it alongside each run.
    let mut token = RandomState::from_seed(2024).to_string();

    for trial_index in 0..10 {
        let state: RandomState = token.parse()?;
        let next = sequencer.next_trial(trial_index, state, &prior)?;

        let lr = next.flags["lr"].as_f64().unwrap_or(0.01);
        let layers = next.flags["layers"].as_i64().unwrap_or(1);
        let optimizer = match &next.flags["optimizer"] {
            FlagValue::Str(name) => name.clone(),
            other => other.to_string(),
        };
        let loss = train(lr, layers, &optimizer);

        println!(
            "trial {:>2} [{}] lr={:.5} layers={} optimizer={} -> loss {:.4}",
            trial_index, next.phase, lr, layers, optimizer, loss
        );

        let mut record = TrialRecord::completed(loss);
        record.flags = next.flags;
        runs.borrow_mut().push(record);
        token = next.random_state.to_string();
    }

    let best = runs
        .borrow()
        .iter()
        .filter_map(|r| r.objective)
        .fold(f64::INFINITY, f64::min);
    println!("best loss after {} trials: {:.4}", runs.borrow().len(), best);
    Ok(())
}
