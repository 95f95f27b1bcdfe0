//! Filter algebra: operators, logical combination and pipeline expansion.
//!
//! This module turns a sequence of [`Filter`] values plus a [`LogicOperator`]
//! into a [`FilterStmt`] whose `clause` is a safe, parameterised SQL fragment
//! and whose `args` carries the bind values. No literal from a filter's value
//! ever appears in `clause`; it always appears only in `args`.

use std::collections::HashMap;
use std::fmt;

use crate::error::{CompositionError, CompositionResult};

/// The closed set of comparison operators a [`Filter`] may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    StartsWith,
    Contains,
    EndsWith,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// The infix SQL symbol for the six scalar comparison operators.
    /// Other operators render through their own fragment shape and don't use
    /// this.
    fn symbol(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Ne => Some("<>"),
            Operator::Gt => Some(">"),
            Operator::Lt => Some("<"),
            Operator::Gte => Some(">="),
            Operator::Lte => Some("<="),
            _ => None,
        }
    }
}

/// How a sequence of filters, or a sequence of [`FilterStmt`]s, are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOperator {
    And,
    Or,
}

impl LogicOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicOperator::And => "AND",
            LogicOperator::Or => "OR",
        }
    }
}

impl fmt::Display for LogicOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// A filter's value, re-architected as a tagged sum over value kinds rather
/// than leaning on runtime reflection (see the design notes on dynamic
/// filter values). `between`/`in` operators match on the sequence variants;
/// anything else is rejected with [`CompositionError::BadValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Strings(Vec<String>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Null,
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Str(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Str(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::Strings(v)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(v: Vec<&str>) -> Self {
        FilterValue::Strings(v.into_iter().map(ToString::to_string).collect())
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(v: Vec<i64>) -> Self {
        FilterValue::Ints(v)
    }
}

impl From<Vec<f64>> for FilterValue {
    fn from(v: Vec<f64>) -> Self {
        FilterValue::Floats(v)
    }
}

impl FilterValue {
    /// Number of positional `?` binds this value expands to under `rebind`:
    /// list-typed values expand to their length, scalars to one.
    pub(crate) fn arity(&self) -> usize {
        match self {
            FilterValue::Strings(v) => v.len(),
            FilterValue::Ints(v) => v.len(),
            FilterValue::Floats(v) => v.len(),
            _ => 1,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A single comparison: an `attr` (a trusted, possibly dotted column
/// reference), an [`Operator`], and a [`FilterValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attr: String,
    pub op: Operator,
    pub val: FilterValue,
}

impl Filter {
    pub fn new(attr: impl Into<String>, op: Operator, val: impl Into<FilterValue>) -> Self {
        Self {
            attr: attr.into(),
            op,
            val: val.into(),
        }
    }
}

/// A parameterised SQL condition fragment plus its bind values.
///
/// An empty `clause` denotes no constraint at all; `args` carries exactly the
/// named parameters the clause references (except list-valued parameters,
/// which expand to their full arity only at [`crate::builder::Builder::rebind`]
/// time).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStmt {
    pub clause: String,
    pub args: HashMap<String, FilterValue>,
}

impl FilterStmt {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

/// `offset`/`size` pagination window. Defaults to `{0, 10}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlLimit {
    pub offset: i64,
    pub size: i64,
}

impl Default for SqlLimit {
    fn default() -> Self {
        SqlLimit { offset: 0, size: 10 }
    }
}

/// Replace every `.` in a dotted attribute with `_` to derive its bind name.
///
/// Not injective (`a.b` and `a_b` collide). Callers that need distinct
/// binds for colliding attrs should route through a [`FilterPipeline`]
/// instead. Preserved from the source for compatibility; see the design
/// notes.
fn param_name(attr: &str) -> String {
    attr.replace('.', "_")
}

fn render(filter: &Filter) -> CompositionResult<(String, Vec<(String, FilterValue)>)> {
    let attr = &filter.attr;
    let p = param_name(attr);

    if let Some(symbol) = filter.op.symbol() {
        return Ok((
            format!("{attr} {symbol} :{p}"),
            vec![(p, filter.val.clone())],
        ));
    }

    match filter.op {
        Operator::StartsWith => {
            let v = require_str(filter)?;
            Ok((format!("{attr} LIKE :{p}"), vec![(p, FilterValue::Str(format!("{v}%")))]))
        }
        Operator::EndsWith => {
            let v = require_str(filter)?;
            Ok((format!("{attr} LIKE :{p}"), vec![(p, FilterValue::Str(format!("%{v}")))]))
        }
        Operator::Contains => {
            let v = require_str(filter)?;
            Ok((format!("{attr} LIKE :{p}"), vec![(p, FilterValue::Str(format!("%{v}%")))]))
        }
        Operator::In => {
            require_nonempty_seq(filter)?;
            Ok((format!("{attr} IN(:{p})"), vec![(p, filter.val.clone())]))
        }
        Operator::NotIn => {
            require_nonempty_seq(filter)?;
            Ok((format!("{attr} NOT IN(:{p})"), vec![(p, filter.val.clone())]))
        }
        Operator::Between => {
            let (lo, hi) = require_pair(filter)?;
            Ok((
                format!("{attr} > :{p}_1 AND {attr} < :{p}_2"),
                vec![(format!("{p}_1"), lo), (format!("{p}_2"), hi)],
            ))
        }
        Operator::NotBetween => {
            // Asymmetric by design: preserved verbatim from the source this
            // was distilled from (see design notes).
            let (lo, hi) = require_pair(filter)?;
            Ok((
                format!("{attr} < :{p}_1 AND {attr} > :{p}_2"),
                vec![(format!("{p}_1"), lo), (format!("{p}_2"), hi)],
            ))
        }
        Operator::IsNull => Ok((format!("{attr} IS NULL"), vec![])),
        Operator::IsNotNull => Ok((format!("{attr} IS NOT NULL"), vec![])),
        _ => unreachable!("scalar operators are handled via symbol() above"),
    }
}

fn require_str(filter: &Filter) -> CompositionResult<&str> {
    filter.val.as_str().ok_or_else(|| {
        CompositionError::bad_value(&filter.attr, "value must be a string for this operator")
    })
}

fn require_nonempty_seq(filter: &Filter) -> CompositionResult<()> {
    let len = match &filter.val {
        FilterValue::Strings(v) => v.len(),
        FilterValue::Ints(v) => v.len(),
        FilterValue::Floats(v) => v.len(),
        _ => {
            return Err(CompositionError::bad_value(
                &filter.attr,
                "value must be a sequence for in/not_in",
            ))
        }
    };

    if len == 0 {
        return Err(CompositionError::bad_value(
            &filter.attr,
            "in/not_in requires a non-empty sequence",
        ));
    }

    Ok(())
}

fn require_pair(filter: &Filter) -> CompositionResult<(FilterValue, FilterValue)> {
    match &filter.val {
        FilterValue::Ints(v) if v.len() == 2 => {
            Ok((FilterValue::Int(v[0]), FilterValue::Int(v[1])))
        }
        FilterValue::Floats(v) if v.len() == 2 => {
            Ok((FilterValue::Float(v[0]), FilterValue::Float(v[1])))
        }
        FilterValue::Strings(v) if v.len() == 2 => {
            Ok((FilterValue::Str(v[0].clone()), FilterValue::Str(v[1].clone())))
        }
        _ => Err(CompositionError::bad_value(
            &filter.attr,
            "between/not_between requires a 2-element sequence of one scalar kind",
        )),
    }
}

fn conditions(filters: &[Filter], op: LogicOperator) -> CompositionResult<FilterStmt> {
    let mut parts = Vec::with_capacity(filters.len());
    let mut args = HashMap::new();

    for filter in filters {
        let (fragment, binds) = render(filter)?;
        parts.push(fragment);
        for (name, value) in binds {
            // Last write wins on collision, matching the source (param_name
            // is not injective).
            args.insert(name, value);
        }
    }

    Ok(FilterStmt {
        clause: parts.join(&format!(" {} ", op.as_sql())),
        args,
    })
}

/// Join `filters` with `AND`. An empty input produces the empty clause.
pub fn where_and(filters: &[Filter]) -> CompositionResult<FilterStmt> {
    conditions(filters, LogicOperator::And)
}

/// Join `filters` with `OR`. An empty input produces the empty clause.
pub fn where_or(filters: &[Filter]) -> CompositionResult<FilterStmt> {
    conditions(filters, LogicOperator::Or)
}

/// Join `filters` with whichever `op` the caller needs. Used by
/// [`crate::builder::Builder::add_filters`], which takes the logic operator
/// as a parameter rather than committing to AND or OR ahead of time.
pub fn where_clause(filters: &[Filter], op: LogicOperator) -> CompositionResult<FilterStmt> {
    conditions(filters, op)
}

/// Merge one or more statements: each non-empty clause is parenthesised and
/// joined with `op`; empty clauses are skipped; `args` maps are merged
/// (later entries win on duplicate keys).
pub fn combine(op: LogicOperator, stmts: &[FilterStmt]) -> FilterStmt {
    let mut clauses = Vec::new();
    let mut args = HashMap::new();

    for stmt in stmts {
        if !stmt.is_empty() {
            clauses.push(format!("({})", stmt.clause));
            for (name, value) in &stmt.args {
                args.insert(name.clone(), value.clone());
            }
        }
    }

    FilterStmt {
        clause: clauses.join(&format!(" {} ", op.as_sql())),
        args,
    }
}

pub fn combine_and(stmts: &[FilterStmt]) -> FilterStmt {
    combine(LogicOperator::And, stmts)
}

pub fn combine_or(stmts: &[FilterStmt]) -> FilterStmt {
    combine(LogicOperator::Or, stmts)
}

/// Rewrites a single filter into a sub-statement before outer combination.
/// The canonical implementation is [`FulltextSearchExpander`]; host code may
/// supply others.
pub trait Expander {
    fn expand(&self, filter: &Filter) -> CompositionResult<FilterStmt>;
}

/// Duplicates a filter across several columns, combined with `OR`: "search
/// term X in any of N columns" without changing the filter input shape.
pub struct FulltextSearchExpander {
    pub fields: Vec<String>,
}

impl Expander for FulltextSearchExpander {
    fn expand(&self, filter: &Filter) -> CompositionResult<FilterStmt> {
        let filters: Vec<Filter> = self
            .fields
            .iter()
            .map(|field| Filter {
                attr: field.clone(),
                op: filter.op,
                val: filter.val.clone(),
            })
            .collect();

        where_or(&filters)
    }
}

/// An `attr` interceptor that replaces one raw filter with a sub-statement
/// produced by `expander`, combined into the outer statement with
/// `combine_op`.
pub struct FilterPipeline {
    pub attr: String,
    pub combine_op: LogicOperator,
    pub expander: Box<dyn Expander>,
}

/// Partitions `filters` by `attr`: filters matching no pipeline are combined
/// with `AND`; every matching filter is expanded and merged into the running
/// statement using its pipeline's `combine_op`.
pub fn filter_to_where_and(
    filters: &[Filter],
    pipelines: &[FilterPipeline],
) -> CompositionResult<FilterStmt> {
    let rest: Vec<Filter> = filters
        .iter()
        .filter(|f| !pipelines.iter().any(|p| p.attr == f.attr))
        .cloned()
        .collect();

    let mut stmt = where_and(&rest)?;

    for filter in filters {
        for pipeline in pipelines {
            if pipeline.attr == filter.attr {
                let sub = pipeline.expander.expand(filter)?;
                stmt = combine(pipeline.combine_op, &[sub, stmt]);
            }
        }
    }

    Ok(stmt)
}
