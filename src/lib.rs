//! Multi-attribute linear hashing
//!
//! A relation of fixed-arity textual tuples stored in linear-hashed buckets,
//! addressed by a composite hash that mixes bits of every attribute's hash as
//! directed by a choice vector. Partial-match queries such as `a,?,x` visit
//! only the buckets whose address agrees with the attributes they fix.

pub mod bits;
pub mod bytes;
pub mod chvec;
pub mod command;
pub mod config;
pub mod consts;
pub mod error;
pub mod execute;
pub mod hash;
mod insert;
pub mod page;
pub mod query;
pub mod relation;
pub mod repl;
mod split;
pub mod stats;
pub mod stdin;
pub mod storage;
pub mod tuple;

pub use chvec::ChoiceVector;
pub use config::{OpenMode, RelationConfig};
pub use error::{MalhError, Result};
pub use page::{Page, PageId, NO_PAGE};
pub use query::Query;
pub use relation::{Relation, Stream};
pub use stats::RelationStats;
pub use tuple::{Pattern, Tuple};
