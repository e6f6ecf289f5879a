//! Output formatting shared by the `reconcile` binary and its tests.
pub mod output;
