mod api;
mod health;

macros_utils::routes! {
    mount health::routes,
    scope "/api" => api::routes,
}
