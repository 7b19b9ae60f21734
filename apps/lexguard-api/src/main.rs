use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lexguard_api::Args::parse();

	lexguard_api::run(args).await
}
