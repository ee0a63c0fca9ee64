pub mod database_status;
pub mod generate_chart;
pub mod health;
pub mod jobs;

pub use database_status::database_status;
pub use generate_chart::generate_chart;
pub use health::health;
pub use jobs::{delete_job, job_status, list_jobs};
