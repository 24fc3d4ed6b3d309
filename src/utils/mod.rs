pub mod data;
pub mod lenient;
pub mod teams;
