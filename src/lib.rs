#[macro_use]
pub mod object;
pub mod query;
pub mod query_builder;
pub mod store;

pub use larder_derive::ObjectShape;
pub use object::*;
pub use query_builder::Q;
pub use store::*;
