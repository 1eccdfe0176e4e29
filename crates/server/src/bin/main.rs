use sightline_server::SightlineServer;

#[derive(clap::Parser)]
struct Args {
    #[arg(long, default_value = "config/sightline.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    // Load config up front for the banner
    use sightline_common::config::AppConfig;
    let app_config = AppConfig::from_file(&args.config).unwrap_or_default();

    println!("--------------------------------------------------");
    println!("   Sightline KPI Gateway");
    println!("   Dataset:     {}", app_config.warehouse.dataset);
    println!("   Cache:       {}", app_config.cache.enabled);
    println!("   Server Addr: {}", app_config.server.listen_addr);
    println!("--------------------------------------------------");

    SightlineServer::new().with_config(&args.config).run().await
}
