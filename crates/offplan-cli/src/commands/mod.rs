pub mod compare;
pub mod mortgage;
pub mod quote;
pub mod schema;
