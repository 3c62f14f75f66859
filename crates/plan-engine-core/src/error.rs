use rust_decimal::Decimal;
use thiserror::Error;

/// Rejections raised at the input boundary. The store is left unchanged
/// whenever one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Unknown field '{field}'")]
    UnknownField { field: String },

    #[error("Unknown role '{role}'")]
    UnknownRole { role: String },

    #[error("Unknown level '{level}' for role '{role}'")]
    UnknownLevel { role: String, level: String },

    #[error("Field '{field}' is not applicable to {role}/{level}")]
    NotApplicable {
        field: String,
        role: String,
        level: String,
    },

    #[error("Field '{field}' is not an input field")]
    NotInput { field: String },

    #[error("Value {value} for '{field}' in month {month} is outside [{min}, {max}]")]
    OutOfBounds {
        field: String,
        month: usize,
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Month {month} is outside 1..=12")]
    MonthOutOfRange { month: usize },

    #[error("Malformed month key '{key}' (expected 6-digit YYYYMM)")]
    MalformedMonthKey { key: String },

    #[error("Month key '{key}' does not belong to plan year {plan_year}")]
    YearMismatch { key: String, plan_year: i32 },
}

/// Roll-up requests that violate the aggregation contract.
#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("Unknown field '{field}'")]
    UnknownField { field: String },

    #[error("Field '{field}' has {scope} scope and cannot be rolled up from roles")]
    WrongScope { field: String, scope: String },

    #[error("Field '{field}' declares no aggregation method")]
    NotAggregatable { field: String },

    #[error("Weight field '{weight}' for '{field}' is not registered")]
    MissingWeight { field: String, weight: String },
}

/// Defects in the derived-field pass. `Cycle` and `UnknownDependency` are
/// registry misconfigurations caught before any value is computed;
/// `DependencyNotReady` distinguishes an engine ordering bug from a genuine
/// zero result.
#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("Dependency cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Field '{field}' depends on unregistered field '{dependency}'")]
    UnknownDependency { field: String, dependency: String },

    #[error("Dependency '{dependency}' of '{field}' was not resolved before use")]
    DependencyNotReady { field: String, dependency: String },
}

/// Registry misuse at construction time.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Field '{field}' is already registered")]
    DuplicateField { field: String },
}

/// Umbrella error for callers that drive a whole recompute pass.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
