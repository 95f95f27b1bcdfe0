//! The [`Builder`]: holds a parsed document, accumulated filters, the current
//! limit and registered token replacers, and emits `(sql, args)` pairs for
//! the document's `subject`/`total` templates.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::document::{ApiDocument, TokenParam};
use crate::error::{CompositionError, CompositionResult};
use crate::filter::{combine, where_clause, Filter, FilterStmt, FilterValue, LogicOperator, SqlLimit};
use crate::tokens::{substitute, Context, Replacer};

/// Which of the document's two templates to compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKey {
    Subject,
    Total,
}

/// Holds a parsed [`ApiDocument`], the filters/limit accumulated so far, and
/// any registered token replacers. One `Builder` per request; it is a plain
/// value and is not shared across concurrent tasks.
///
/// `build`/`rebind` are idempotent and do not consume the builder. The
/// accumulated filter statement persists across calls so a caller can build
/// both `subject` and `total` from the same accumulated state.
#[derive(Debug, Clone)]
pub struct Builder {
    document: ApiDocument,
    tokens: HashMap<String, Replacer>,
    conditions: FilterStmt,
    limit: SqlLimit,
}

impl Builder {
    /// Parse `document_text` and return a fresh builder seeded with it.
    pub fn new(document_text: &str) -> CompositionResult<Self> {
        let document = ApiDocument::parse(document_text)?;
        Ok(Self {
            document,
            tokens: HashMap::new(),
            conditions: FilterStmt::default(),
            limit: SqlLimit::default(),
        })
    }

    /// The parsed document this builder was seeded with.
    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    /// Build a fresh statement from `filters` joined with `logic_op`, then
    /// combine it into the accumulated statement using the same `logic_op`
    /// (the accumulated clause is parenthesised as part of that combine).
    ///
    /// `add_filters(A)` then `add_filters(B)` yields a statement
    /// semantically equivalent to `((acc) logic_A (A)) logic_B (B)`, never
    /// reordered. On failure (e.g. a filter's value doesn't match its
    /// operator's shape) the accumulated state is left untouched.
    pub fn add_filters(
        &mut self,
        filters: &[Filter],
        logic_op: LogicOperator,
    ) -> CompositionResult<&mut Self> {
        let fresh = where_clause(filters, logic_op)?;
        self.conditions = combine(logic_op, &[self.conditions.clone(), fresh]);
        Ok(self)
    }

    /// Set the current `LIMIT` window.
    pub fn limit(&mut self, offset: i64, size: i64) -> &mut Self {
        self.limit = SqlLimit { offset, size };
        self
    }

    /// Install a custom token replacer under `name`.
    ///
    /// `name` must be declared in the document's `composition.tokens`; this
    /// fails with [`CompositionError::UnknownToken`] otherwise. `factory` is
    /// handed the token's declared parameters and must produce the
    /// [`Replacer`] to install. A registered token may override a built-in
    /// (`where`, `limit`, `fields.<group>`). This precedence is intentional
    /// and documented, not a bug.
    pub fn register_token<F>(&mut self, name: &str, factory: F) -> CompositionResult<&mut Self>
    where
        F: FnOnce(&[TokenParam]) -> Replacer,
    {
        let token = self
            .document
            .composition
            .tokens
            .get(name)
            .ok_or_else(|| CompositionError::UnknownToken {
                name: name.to_string(),
            })?;

        let replacer = factory(&token.params);
        self.tokens.insert(name.to_string(), replacer);

        tracing::debug!(token = name, "registered token replacer");

        Ok(self)
    }

    fn template_for(&self, key: TemplateKey) -> CompositionResult<&str> {
        match key {
            TemplateKey::Subject => Ok(self.document.composition.subject.as_str()),
            TemplateKey::Total => self
                .document
                .composition
                .total
                .as_deref()
                .ok_or(CompositionError::NoTotal),
        }
    }

    fn assemble_context(&self) -> Context {
        let mut ctx: Context = HashMap::new();

        ctx.insert("where".to_string(), Replacer::Where(self.conditions.clone()));
        ctx.insert("limit".to_string(), Replacer::Limit(self.limit));

        for (group, fields) in &self.document.composition.fields {
            ctx.insert(format!("fields.{group}"), Replacer::Fields(fields.clone()));
        }

        for (name, replacer) in &self.tokens {
            ctx.insert(name.clone(), replacer.clone());
        }

        ctx
    }

    /// Compose `key`'s template: resolve every `%name` placeholder against
    /// the current context and return the resulting SQL plus a copy of the
    /// accumulated named parameters.
    pub fn build(&self, key: TemplateKey) -> CompositionResult<(String, HashMap<String, FilterValue>)> {
        let template = self.template_for(key)?;
        let ctx = self.assemble_context();
        let sql = substitute(template, &ctx)?;

        tracing::debug!(?key, document = %self.document.info.name, "composed sql");

        Ok((sql, self.conditions.args.clone()))
    }

    /// As [`Builder::build`], but also reorders named parameters into
    /// positional `?` placeholders following the sequence of `:name`
    /// occurrences in the final SQL. List-valued parameters expand to
    /// `(?,?,…)` with the right arity; a parameter referenced more than once
    /// appears once per occurrence.
    pub fn rebind(&self, key: TemplateKey) -> CompositionResult<(String, Vec<FilterValue>)> {
        let (sql, args) = self.build(key)?;
        let re = bind_pattern();

        let mut out = String::with_capacity(sql.len());
        let mut positional = Vec::new();
        let mut cursor = 0;

        for m in re.find_iter(&sql) {
            out.push_str(&sql[cursor..m.start()]);
            let name = &m.as_str()[1..];
            let value = args.get(name).ok_or_else(|| {
                CompositionError::bad_context(name, "bound parameter missing from args")
            })?;

            let arity = value.arity();
            let marks = std::iter::repeat("?").take(arity).collect::<Vec<_>>().join(",");
            out.push_str(&marks);
            expand_scalars(value, &mut positional);

            cursor = m.end();
        }
        out.push_str(&sql[cursor..]);

        Ok((out, positional))
    }
}

fn bind_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").unwrap())
}

fn expand_scalars(value: &FilterValue, out: &mut Vec<FilterValue>) {
    match value {
        FilterValue::Strings(vs) => out.extend(vs.iter().cloned().map(FilterValue::Str)),
        FilterValue::Ints(vs) => out.extend(vs.iter().cloned().map(FilterValue::Int)),
        FilterValue::Floats(vs) => out.extend(vs.iter().cloned().map(FilterValue::Float)),
        other => out.push(other.clone()),
    }
}
