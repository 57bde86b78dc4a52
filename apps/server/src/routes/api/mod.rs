mod check_status;
mod sites;

macros_utils::routes! {
    mount check_status::routes,
    mount sites::routes,
}
