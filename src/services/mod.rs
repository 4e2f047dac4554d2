pub mod reconciliation;

pub use reconciliation::{DashboardSummary, EventOutcome, ReconciliationEngine};
