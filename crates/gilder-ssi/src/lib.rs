//! Server-side include directives.
//!
//! Parses `<!--#include ... -->`, `<!--#set ... -->` and `<!--#echo ... -->`
//! comments in HTML and expands them against a document root. Used by both the
//! build (to assemble pages in the output tree) and the dev server (to assemble
//! pages on the fly).

pub mod directive;
pub mod resolver;

pub use directive::{parse_directives, Directive, DirectiveKind, IncludeKind};
pub use resolver::{IncludeError, IncludeResolver};
