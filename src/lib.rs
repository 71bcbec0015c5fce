// Library exports for eggtab
pub mod aggregate;
pub mod annotation;
pub mod consensus;
pub mod contigs;
pub mod counts;
pub mod export;
pub mod input;
pub mod inventory;
pub mod pipeline;
pub mod xref;
