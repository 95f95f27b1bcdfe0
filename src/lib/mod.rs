//! sqlcompose
//!
//! Turns a declarative YAML "API document" into safe, parameterised SQL. A
//! document declares a `subject` template (and optionally a `total` count
//! template), named field groups, and named tokens; a [`Builder`] is seeded
//! with a parsed document, accumulates caller-supplied filters and a limit
//! window, and composes the final SQL string plus its named parameter map by
//! substituting every `%placeholder` in the chosen template.
//!
//! This crate produces prepared-statement text and a bind map. It never
//! executes SQL itself, never pools connections, and never parses the
//! author-supplied SQL fragments it substitutes (`subject`, `total`,
//! `fields.*.expr`, custom token output are all trusted strings).
//!
//! ```
//! use sqlcompose::builder::{Builder, TemplateKey};
//! use sqlcompose::filter::{Filter, LogicOperator, Operator};
//!
//! let doc = r#"
//! info:
//!   name: users-by-name
//! composition:
//!   fields:
//!     base:
//!       - name: name
//!         expr: users.name
//!   subject: "SELECT %fields.base FROM users %where %limit"
//! "#;
//!
//! let mut builder = Builder::new(doc).unwrap();
//! builder
//!     .add_filters(&[Filter::new("users.name", Operator::Contains, "Barry")], LogicOperator::And)
//!     .unwrap();
//! builder.limit(0, 10);
//!
//! let (sql, args) = builder.build(TemplateKey::Subject).unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT users.name AS name FROM users WHERE users.name LIKE :users_name LIMIT 0, 10"
//! );
//! assert!(args.contains_key("users_name"));
//! ```

pub mod builder;
pub mod document;
pub mod error;
pub mod filter;
pub mod tokens;

pub use builder::{Builder, TemplateKey};
pub use document::ApiDocument;
pub use error::{CompositionError, CompositionResult};
pub use filter::{
    combine, combine_and, combine_or, filter_to_where_and, where_and, where_or, Expander, Filter,
    FilterPipeline, FilterStmt, FilterValue, FulltextSearchExpander, LogicOperator, Operator,
    SqlLimit,
};
pub use tokens::{substitute, Context, Replacer};
