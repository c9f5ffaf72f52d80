pub mod alerts;
pub mod analytics;
pub mod database;
pub mod metrics;
pub mod populate;
pub mod sync;

pub use database::MongoDb;
pub use metrics::{get_metrics, init_metrics};
pub use sync::{PaymentTotals, Synchronizer};
