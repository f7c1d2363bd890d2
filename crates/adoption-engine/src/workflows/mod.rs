pub mod adoption;
pub mod catalog;
