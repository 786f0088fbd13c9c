pub mod landmarks;
pub mod liveness;
pub mod pipeline;
pub mod shared;
pub mod video;
