pub mod calendar;
pub mod models;
pub mod selection;
