pub mod all_diagnostics;
pub mod duration;
pub mod range;
