pub mod playback_stage;
