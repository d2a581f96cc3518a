//! Reconcilers - bring graph state in line with freshly observed DNS facts

pub mod discovery;
pub mod enumerate;
pub mod selectors;

pub use discovery::{validate_root, DiscoveryReconciler};
pub use enumerate::{EnumerationOutcome, Enumerator, FindomainEnumerator};
pub use selectors::{candidate_selectors, ReconciledDomain, SelectorReconciler};
