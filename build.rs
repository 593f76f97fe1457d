fn main() {
    // ESP-IDF builds need the sysenv exported by embuild so esp-idf-sys can
    // locate the toolchain. Host builds have nothing to generate.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
