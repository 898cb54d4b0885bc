pub mod directory;
pub mod similarity;
pub mod resolver;
pub mod enrichment;
