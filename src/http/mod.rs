//! Response types and the `RouteModule` trait for organizing routes.

pub mod response;
pub mod routes;

pub use response::CreatedResponse;
pub use routes::RouteModule;
