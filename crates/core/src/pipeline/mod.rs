pub mod infrastructure;
pub mod job_observer;
pub mod job_pipeline;
pub mod job_runner;
pub mod job_status;
pub mod job_workspace;
pub mod media_prober;
pub mod recognition_adapter;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;
