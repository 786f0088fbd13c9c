pub(crate) mod classification_loop;
pub mod detect_liveness_use_case;
pub mod infrastructure;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod verdict_sink;

#[cfg(test)]
mod test_support;
