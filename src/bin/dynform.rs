fn main() -> anyhow::Result<()> {
    dynform::cli::run_cli()
}
