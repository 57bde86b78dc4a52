//! Small declarative helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
pub use actix_web;

/// Declare the route set of a module as a `routes(cfg)` function.
///
/// `route` entries register a handler generated by the actix route macros,
/// `mount` entries merge another module's `routes` at the same level and
/// `scope` entries mount them under a path prefix.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     mount status::routes,
///     scope "/api" => api::routes,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($($body:tt)*) => {
        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $crate::__route_entries!(cfg; $($body)*);
        }
    };
}

#[cfg(feature = "actix")]
#[doc(hidden)]
#[macro_export]
macro_rules! __route_entries {
    ($cfg:ident;) => {};
    ($cfg:ident; route $handler:ident $(, $($rest:tt)*)?) => {
        $cfg.service($handler);
        $crate::__route_entries!($cfg; $($($rest)*)?);
    };
    ($cfg:ident; mount $configure:path $(, $($rest:tt)*)?) => {
        $cfg.configure($configure);
        $crate::__route_entries!($cfg; $($($rest)*)?);
    };
    ($cfg:ident; scope $prefix:literal => $configure:path $(, $($rest:tt)*)?) => {
        $cfg.service($crate::actix_web::web::scope($prefix).configure($configure));
        $crate::__route_entries!($cfg; $($($rest)*)?);
    };
}
