mod pins;
mod reconcile;

pub use reconcile::{PricingReconciler, ReconcileOutcome};
