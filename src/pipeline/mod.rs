pub mod replay;
pub mod speller;

// Re-exports for convenience
pub use replay::{ReplayStream, parse_replay, script_frames, start_replay, write_replay};
pub use speller::{Speller, start_speller};
