//! CLI command implementations.

mod config;
mod doctor;
mod keywords;
mod list;
mod migrate;
mod process;
mod report;
mod run;

pub use config::run_config;
pub use doctor::run_doctor;
pub use keywords::run_keywords;
pub use list::run_list;
pub use migrate::run_migrate;
pub use process::run_process;
pub use report::run_report;
pub use run::run_pipeline;
