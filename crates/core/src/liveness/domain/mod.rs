pub mod color_sampler;
pub mod decision_engine;
pub mod facial_region;
pub mod frame_diff;
pub mod liveness_classifier;
pub mod liveness_config;
pub mod window_aggregator;
