pub mod app_config;
pub mod config;
pub mod metrics;
pub mod normalize;
pub mod records;
pub mod schema;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use metrics::{MetricsRange, MetricsSnapshot};
pub use normalize::normalize_records;
pub use records::{NormalizedBatch, NullCounts, RawRecordSet, SpendRecord};
pub use schema::{validate_columns, SchemaError, REQUIRED_COLUMNS};
