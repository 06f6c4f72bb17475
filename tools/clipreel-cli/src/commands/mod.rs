pub mod assemble;
pub mod check;
pub mod clean;
pub mod counter;
pub mod title;
