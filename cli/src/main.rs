fn main() {
    std::process::exit(perfsweep_cli::run());
}
