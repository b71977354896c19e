//! Operation counter for the backend facade.
//!
//! Every facade call bumps [`OP_COUNTER`] once on entry (`outcome="attempt"`) and once on exit
//! (`success` or `failure`). The `op` label is one of `admin_config`, `role`, `issue`, `renew`,
//! `revoke` or `version`, so issuance error rates read as `failure / attempt` per `op`.

// self
use crate::obs::{OpKind, OpOutcome};

/// Counter name exported to the installed `metrics` recorder.
pub const OP_COUNTER: &str = "artifactory_secrets_op_total";

/// Increments [`OP_COUNTER`] for `kind` and `outcome`. Compiles to nothing without `metrics`.
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(OP_COUNTER, "op" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
