pub mod detail;
pub mod runs;
