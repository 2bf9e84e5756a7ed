use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};

use serde::{Deserialize, Serialize};
use tracing::info;

use sw_optimizer::{SearchPhase, Sequencer, SequencerConfig};
use sw_types::{
    config_error, ErrorKind, FlagDeclarations, FlagValue, RandomState, SwError, SwResult,
    TrialRecord,
};

/// Environment variable naming the request file; unset or `-` means stdin.
pub const REQUEST_ENV: &str = "STEPWISE_REQUEST";

/// One suggestion request as handed over by a batch runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub flags: FlagDeclarations,
    /// Defaults to the number of completed trials in `history`.
    #[serde(default)]
    pub trial_index: Option<usize>,
    /// Token returned by the previous trial.
    #[serde(default)]
    pub random_state: Option<RandomState>,
    /// Seed for a fresh token when the search has none yet.
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub history: Vec<TrialRecord>,
    #[serde(default)]
    pub config: SequencerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub flags: BTreeMap<String, FlagValue>,
    pub random_state: RandomState,
    pub phase: SearchPhase,
    pub trial_index: usize,
}

impl BatchRequest {
    fn resolve_trial_index(&self) -> usize {
        self.trial_index
            .unwrap_or_else(|| self.history.iter().filter(|r| r.is_completed()).count())
    }

    fn resolve_random_state(&self) -> RandomState {
        match (&self.random_state, self.random_seed) {
            (Some(state), _) => state.clone(),
            (None, Some(seed)) => RandomState::from_seed(seed),
            (None, None) => {
                let seed: u64 = rand::random();
                info!(seed, "no random state supplied, seeding from entropy");
                RandomState::from_seed(seed)
            }
        }
    }
}

/// Compute the suggestion for one request.
pub fn run(request: BatchRequest) -> SwResult<BatchResponse> {
    let trial_index = request.resolve_trial_index();
    let random_state = request.resolve_random_state();
    let BatchRequest {
        flags,
        history,
        config,
        ..
    } = request;

    let sequencer = Sequencer::new(flags, config)?;
    let prior = move || -> SwResult<Vec<TrialRecord>> { Ok(history.clone()) };
    let suggestion = sequencer.next_trial(trial_index, random_state, &prior)?;

    Ok(BatchResponse {
        flags: suggestion.flags,
        random_state: suggestion.random_state,
        phase: suggestion.phase,
        trial_index: suggestion.trial_index,
    })
}

/// Parse a request; malformed input is a configuration error.
pub fn read_request(reader: impl Read) -> SwResult<BatchRequest> {
    serde_json::from_reader(reader).map_err(|e| config_error!("invalid request: {}", e))
}

/// Load a request from `path`, or from stdin when `path` is `None` or `-`.
pub fn load_request(path: Option<&str>) -> SwResult<BatchRequest> {
    match path {
        None | Some("-") => read_request(io::stdin().lock()),
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| config_error!("cannot open request file {}: {}", path, e))?;
            read_request(BufReader::new(file))
        }
    }
}

pub fn write_response(mut writer: impl Write, response: &BatchResponse) -> SwResult<()> {
    serde_json::to_writer(&mut writer, response)?;
    writeln!(writer)?;
    Ok(())
}

/// Process exit code for a failed suggestion.
pub fn exit_code(err: &SwError) -> i32 {
    match err.kind() {
        ErrorKind::Configuration => 2,
        ErrorKind::Sequencing => 3,
        ErrorKind::DataIntegrity => 4,
        ErrorKind::Other => 1,
    }
}
