// Entity section store: parse, compose and merge `## <title>` blocks.

pub mod merge;
pub mod parser;
pub mod slug;
pub mod summary;

pub use merge::{ensure_section, merge_section, MergeError, MergeOutcome, SectionEdit};
pub use parser::{
    compose_document, compose_section, compose_sections, parse_document, parse_sections,
    SectionDocument,
};
