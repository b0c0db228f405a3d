pub mod client;
pub mod config;
pub mod offline;
pub mod online;
pub mod report;
pub mod scenario;
pub mod server;
pub mod suite;

pub use client::{ApiClient, ApiError, ApiResponse, ApiResult, DefectQuery, NewDefect};
pub use config::{
    ConfigError, ConfigResult, Credentials, HarnessConfig, ReadinessConfig, ServerConfig,
};
pub use offline::offline_scenarios;
pub use online::{
    online_scenarios, AuthEnforcement, DefectCrud, FilteringAndPagination, OnlineContext,
    ProjectsAndStatistics, RegistrationAndLogin,
};
pub use report::{
    ReportError, ReportResult, ScenarioOutcome, SuiteReport, TierReport, TierStatus,
};
pub use scenario::{Check, Scenario, ScenarioError, ScenarioRegistry, ScenarioResult, Tier};
pub use server::{wait_until_ready, ServerError, ServerHandle, ServerResult};
pub use suite::{run_offline, run_online, run_suite, selected_tiers};
