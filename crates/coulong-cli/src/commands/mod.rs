pub mod eval;
pub mod table;
