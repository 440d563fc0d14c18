fn main() {
    blockflow::projects::cli::start_cli();
}
