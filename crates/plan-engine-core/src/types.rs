use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.8 = 80% utilization). Never as percentages.
pub type Rate = Decimal;

/// Number of month slots in every value record: one fiscal year.
pub const MONTHS: usize = 12;

/// Interned field identifier, assigned by registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u16);

/// Interned role identifier, assigned by insertion order into a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub u16);

/// Seniority ladder. The declaration order is the strict total order used
/// for journey bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    A,
    AC,
    C,
    SrC,
    AM,
    M,
    SrM,
    PiP,
}

impl Level {
    /// Every level in ascending seniority order.
    pub const LADDER: [Level; 8] = [
        Level::A,
        Level::AC,
        Level::C,
        Level::SrC,
        Level::AM,
        Level::M,
        Level::SrM,
        Level::PiP,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A => "A",
            Level::AC => "AC",
            Level::C => "C",
            Level::SrC => "SrC",
            Level::AM => "AM",
            Level::M => "M",
            Level::SrM => "SrM",
            Level::PiP => "PiP",
        }
    }

    pub fn parse(s: &str) -> Option<Level> {
        Level::LADDER.iter().copied().find(|l| l.as_str() == s)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An organizational category. Leveled roles span the full seniority ladder;
/// flat roles carry one implicit level. The billable flag gates
/// revenue-related fields (price, utilization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub billable: bool,
    #[serde(default = "default_leveled")]
    pub leveled: bool,
}

fn default_leveled() -> bool {
    true
}

impl Role {
    pub fn leveled(name: &str, billable: bool) -> Self {
        Role {
            name: name.to_string(),
            billable,
            leveled: true,
        }
    }

    pub fn flat(name: &str, billable: bool) -> Self {
        Role {
            name: name.to_string(),
            billable,
            leveled: false,
        }
    }

    /// Level slots of this role. Flat roles have the single implicit slot.
    pub fn level_slots(&self) -> Vec<Option<Level>> {
        if self.leveled {
            Level::LADDER.iter().copied().map(Some).collect()
        } else {
            vec![None]
        }
    }
}

/// Whether a field is user-planned, derived from other fields, or shown
/// without entering any computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Input,
    Calculated,
    Display,
}

/// Semantic unit of a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Currency,
    Percentage,
    Count,
    Hours,
    Rate,
    Ratio,
}

/// Where a field's values live in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    Office,
    Role,
    RoleLevel,
}

impl FieldScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldScope::Office => "office",
            FieldScope::Role => "role",
            FieldScope::RoleLevel => "role_level",
        }
    }
}

/// How child (role/level) values combine into a parent (office) value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    /// Unweighted mean over contributors present that month (headcount > 0).
    Average,
    /// Mean weighted by another field, typically `fte`.
    WeightedAverage { weight: String },
    /// The field does not roll up.
    None,
}

/// Declarative formula for a `Calculated` field. Formulas are data, not
/// closures, so they can be inspected for dependencies and tested on their
/// own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// Sum of the named fields, month by month.
    Sum(Vec<String>),
    /// `plus − minus`, month by month.
    Difference { plus: String, minus: String },
    /// Product of the named fields, month by month.
    Product(Vec<String>),
    /// `numerator ÷ denominator`; defined as zero when the denominator is
    /// zero for that month.
    Ratio { numerator: String, denominator: String },
}

impl Formula {
    /// Field ids this formula reads, in declaration order.
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Formula::Sum(terms) | Formula::Product(terms) => {
                terms.iter().map(String::as_str).collect()
            }
            Formula::Difference { plus, minus } => vec![plus, minus],
            Formula::Ratio {
                numerator,
                denominator,
            } => vec![numerator, denominator],
        }
    }
}

/// Inclusive validation bounds for input values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl Bounds {
    pub fn contains(&self, v: Decimal) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Definition of one plannable or derived metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    pub value_kind: ValueKind,
    pub scope: FieldScope,
    pub aggregation: Aggregation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
    /// Allow-list of role names; absence means all roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles_allow: Option<Vec<String>>,
    /// Deny-list of role names; always overrides the allow-list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles_deny: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels_allow: Option<Vec<Level>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels_deny: Vec<Level>,
    /// Restrict to roles with the billable flag set.
    #[serde(default)]
    pub billable_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl FieldDef {
    pub fn input(
        id: &str,
        label: &str,
        value_kind: ValueKind,
        scope: FieldScope,
        aggregation: Aggregation,
    ) -> Self {
        FieldDef {
            id: id.to_string(),
            label: label.to_string(),
            kind: FieldKind::Input,
            value_kind,
            scope,
            aggregation,
            formula: None,
            roles_allow: None,
            roles_deny: Vec::new(),
            levels_allow: None,
            levels_deny: Vec::new(),
            billable_only: false,
            bounds: None,
        }
    }

    pub fn calculated(
        id: &str,
        label: &str,
        value_kind: ValueKind,
        scope: FieldScope,
        aggregation: Aggregation,
        formula: Formula,
    ) -> Self {
        FieldDef {
            formula: Some(formula),
            kind: FieldKind::Calculated,
            ..FieldDef::input(id, label, value_kind, scope, aggregation)
        }
    }

    pub fn display(id: &str, label: &str, value_kind: ValueKind, scope: FieldScope) -> Self {
        FieldDef {
            kind: FieldKind::Display,
            ..FieldDef::input(id, label, value_kind, scope, Aggregation::None)
        }
    }

    pub fn with_bounds(mut self, min: Decimal, max: Decimal) -> Self {
        self.bounds = Some(Bounds { min, max });
        self
    }

    pub fn billable_only(mut self) -> Self {
        self.billable_only = true;
        self
    }

    pub fn allow_roles(mut self, roles: &[&str]) -> Self {
        self.roles_allow = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn deny_roles(mut self, roles: &[&str]) -> Self {
        self.roles_deny = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn allow_levels(mut self, levels: &[Level]) -> Self {
        self.levels_allow = Some(levels.to_vec());
        self
    }

    pub fn deny_levels(mut self, levels: &[Level]) -> Self {
        self.levels_deny = levels.to_vec();
        self
    }

    /// Dependency ids of this field; empty for non-calculated fields.
    pub fn dependencies(&self) -> Vec<&str> {
        self.formula
            .as_ref()
            .map(Formula::dependencies)
            .unwrap_or_default()
    }
}

/// Twelve month slots plus the yearly total. The total is the sum of the
/// slots, except for `Average`-aggregated fields where it is the mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyValue {
    pub months: [Decimal; MONTHS],
    pub total: Decimal,
}

impl MonthlyValue {
    pub const ZERO: MonthlyValue = MonthlyValue {
        months: [Decimal::ZERO; MONTHS],
        total: Decimal::ZERO,
    };

    /// Build with `total = Σ months`.
    pub fn summed(months: [Decimal; MONTHS]) -> Self {
        let total = months.iter().copied().sum();
        MonthlyValue { months, total }
    }

    /// Build with `total = mean(months)`.
    pub fn averaged(months: [Decimal; MONTHS]) -> Self {
        let sum: Decimal = months.iter().copied().sum();
        MonthlyValue {
            months,
            total: sum / Decimal::from(MONTHS as u32),
        }
    }

    /// Build per the field's aggregation semantics.
    pub fn totalled(months: [Decimal; MONTHS], aggregation: &Aggregation) -> Self {
        match aggregation {
            Aggregation::Average | Aggregation::WeightedAverage { .. } => {
                MonthlyValue::averaged(months)
            }
            _ => MonthlyValue::summed(months),
        }
    }

    /// Same value in every slot, summed total. Test and fixture helper.
    pub fn constant(v: Decimal) -> Self {
        MonthlyValue::summed([v; MONTHS])
    }

    pub fn is_zero(&self) -> bool {
        self.months.iter().all(|m| m.is_zero()) && self.total.is_zero()
    }
}

impl Default for MonthlyValue {
    fn default() -> Self {
        MonthlyValue::ZERO
    }
}
