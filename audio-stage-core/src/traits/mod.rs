pub mod sample_source;
pub mod stage_delegate;
