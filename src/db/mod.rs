// Module for relational database access
pub mod gateway;
pub mod value;

pub use gateway::{DatabaseGateway, QueryResult};
pub use value::{Row, SqlValue};
