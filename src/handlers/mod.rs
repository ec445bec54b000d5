pub mod hover;
pub mod lifecycle;
