fn main() -> Result<(), Box<dyn std::error::Error>> {
    manscope_cli::run()
}
