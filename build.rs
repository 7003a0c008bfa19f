fn main() {
    // ESP-IDF build env propagation is only meaningful when the espidf
    // feature is enabled (host test builds skip it).
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
