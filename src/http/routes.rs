use crate::app::AppContext;
use axum::Router;

/// A group of routes mounted together.
///
/// ```rust,ignore
/// struct ContactModule;
///
/// impl RouteModule for ContactModule {
///     fn routes(&self) -> Router<AppContext> {
///         Router::new().route("/contact", post(send_message))
///     }
///
///     fn prefix(&self) -> Option<&str> {
///         Some("/api")
///     }
/// }
/// ```
pub trait RouteModule {
    /// Routes without state applied; the `App` provides `AppContext`.
    fn routes(&self) -> Router<AppContext>
    where
        Self: Sized;

    /// Path prefix to nest the routes under
    fn prefix(&self) -> Option<&str> {
        None
    }
}
