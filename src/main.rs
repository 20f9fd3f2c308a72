fn main() -> std::process::ExitCode {
    subcount::cli::run()
}
