pub mod employee;
pub mod resources;
