pub mod errors;
pub mod facade;
pub mod models;
pub mod providers;
pub mod tools;
