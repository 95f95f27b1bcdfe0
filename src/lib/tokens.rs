//! Token substitution: the placeholder scanner, the composition context, and
//! the built-in replacers for `where`, `limit` and `fields.<group>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::document::FieldDef;
use crate::error::{CompositionError, CompositionResult};
use crate::filter::{FilterStmt, SqlLimit};

/// A value installed in the composition context under a placeholder name.
///
/// This is the re-architected replacement for the source's duck-typed
/// `TokenReplacer` interface: a small closed sum instead of a heterogeneous
/// dynamic map. `Literal` is the "string values are substituted verbatim"
/// case from the token-substitution contract.
#[derive(Clone)]
pub enum Replacer {
    Literal(String),
    Where(FilterStmt),
    Limit(SqlLimit),
    Fields(Vec<FieldDef>),
    Custom(Arc<dyn Fn(&Context) -> String + Send + Sync>),
}

impl Replacer {
    fn render(&self, ctx: &Context) -> String {
        match self {
            Replacer::Literal(s) => s.clone(),
            Replacer::Where(stmt) => {
                if stmt.is_empty() {
                    String::new()
                } else {
                    format!("WHERE {}", stmt.clause)
                }
            }
            Replacer::Limit(limit) => format!("LIMIT {}, {}", limit.offset, limit.size),
            Replacer::Fields(defs) => defs
                .iter()
                .map(|d| format!("{} AS {}", d.expr, d.name))
                .collect::<Vec<_>>()
                .join(", "),
            Replacer::Custom(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacer::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Replacer::Where(stmt) => f.debug_tuple("Where").field(stmt).finish(),
            Replacer::Limit(limit) => f.debug_tuple("Limit").field(limit).finish(),
            Replacer::Fields(defs) => f.debug_tuple("Fields").field(defs).finish(),
            Replacer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for Replacer {
    fn from(v: &str) -> Self {
        Replacer::Literal(v.to_string())
    }
}

impl From<String> for Replacer {
    fn from(v: String) -> Self {
        Replacer::Literal(v)
    }
}

impl From<FilterStmt> for Replacer {
    fn from(v: FilterStmt) -> Self {
        Replacer::Where(v)
    }
}

impl From<SqlLimit> for Replacer {
    fn from(v: SqlLimit) -> Self {
        Replacer::Limit(v)
    }
}

/// The composition context: every `%name` placeholder a template may
/// reference resolves against this map. Reserved keys are `where` and
/// `limit`; `fields.<group>` is namespaced per declared field group; every
/// other key comes from `Builder::register_token`.
pub type Context = HashMap<String, Replacer>;

fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%([\w.]+)").unwrap())
}

/// Scan `template` left to right for `%name` placeholders and replace each
/// occurrence exactly once against `ctx`, then normalise whitespace (literal
/// newlines/tabs become single spaces; multi-space runs are left alone).
pub fn substitute(template: &str, ctx: &Context) -> CompositionResult<String> {
    let re = placeholder_pattern();
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;

    for m in re.find_iter(template) {
        out.push_str(&template[cursor..m.start()]);
        let name = &m.as_str()[1..];
        let replacer = ctx.get(name).ok_or_else(|| {
            CompositionError::bad_context(name, "not defined in the composition context")
        })?;
        out.push_str(&replacer.render(ctx));
        cursor = m.end();
    }
    out.push_str(&template[cursor..]);

    Ok(normalize_whitespace(&out))
}

fn normalize_whitespace(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect()
}
