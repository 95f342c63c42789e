fn main() {
    // ESP-IDF environment is only needed for the device build; host tests
    // build without the espidf feature and skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
