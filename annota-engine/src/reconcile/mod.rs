//! Reconciliation of live label paths with AI suggestions

pub mod ai_reconciler;

pub use ai_reconciler::{is_implicitly_accepted, AiAnnotationReconciler, AiSnapshot};
