fn main() {
    radial_profile::cli::run();
}
