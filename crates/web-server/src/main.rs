// This main function is the entry point when running `cargo run -p web-server`.
// It loads settings the same way the `pinesmith serve` command does.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = configuration::load_settings(None)?;
    let _guard = configuration::init_tracing(&settings.logging)?;
    web_server::run_server(settings).await
}
