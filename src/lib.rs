//! Flag-semaphore speller.
//!
//! Per frame, each arm's shoulder, elbow and hand positions are reduced to a
//! clock hour ([`semaphore::clock_code`]), the pair of hours is looked up in
//! the semaphore alphabet ([`semaphore::LetterClassifier`]), and a letter is
//! confirmed into the word once its pose has been held long enough
//! ([`debounce::DebounceStateMachine`], [`word::WordBuffer`]).
//! [`pipeline::start_speller`] runs all of that on one worker thread fed by a
//! frame channel.

pub mod config;
pub mod debounce;
pub mod pipeline;
pub mod semaphore;
pub mod types;
pub mod word;
