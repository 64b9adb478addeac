//! Grammar analysis and LL(1)/SLR(1) table construction.

pub mod grammar;
pub mod ll1;
pub mod lr0;
pub mod parse_tree;
pub mod slr;
pub mod syntax;
pub mod types;
pub mod util;
