//! Single-shot entry point used by batch runners.
//!
//! A batch runner launches `sw-suggest` once per trial with a JSON request
//! describing the flag declarations, the trial history and the random-state
//! token from the previous trial. The binary answers with the next trial's
//! flags and the token to persist, then exits with a code that tells the
//! runner what kind of failure, if any, occurred.

pub mod request;

pub use request::{
    exit_code, load_request, read_request, run, write_response, BatchRequest, BatchResponse,
    REQUEST_ENV,
};
