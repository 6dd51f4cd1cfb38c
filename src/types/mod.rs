pub mod counter;
pub mod tier;
