pub mod json_report_sink;
pub mod sequential_pipeline_executor;
pub mod threaded_pipeline_executor;
