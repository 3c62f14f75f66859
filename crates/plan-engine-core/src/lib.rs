//! Workforce and financial planning engine.
//!
//! An in-memory hierarchical planning model for one (office, year) pair:
//! a field registry with role/level applicability rules, monthly
//! time-series values per (role, level) leaf, roll-up aggregation to role
//! and office totals, and derived KPI computation (net sales, EBITDA,
//! margins, seniority-journey mix) with baseline comparison.
//!
//! The engine performs no I/O and holds no global state: callers construct
//! a [`registry::FieldRegistry`] once, feed a [`store::OfficeYearPlan`]
//! through [`ingest`] or direct `set_input` calls, and run
//! [`evaluate::recalculate`] after each mutation batch. Plans for different
//! (office, year) pairs are independent values and may be processed on
//! separate threads.

pub mod aggregate;
pub mod baseline;
pub mod error;
pub mod evaluate;
pub mod ingest;
pub mod journey;
pub mod projection;
pub mod registry;
pub mod store;
pub mod types;

pub use error::{
    AggregationError, EvaluationError, PlanError, RegistryError, ValidationError,
};
pub use types::*;

/// Standard result type for all planning-engine operations.
pub type PlanResult<T> = Result<T, PlanError>;
