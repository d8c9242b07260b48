// Plan reconciliation exports
pub mod reconciler;

pub use reconciler::{BillingProvider, PlanReconciler, PlanStore, ProviderError, StoreError};
