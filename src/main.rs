fn main() -> anyhow::Result<()> {
    dailynote::cli::run()
}
