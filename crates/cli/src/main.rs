fn main() -> std::process::ExitCode {
    confidant_cli::run()
}
