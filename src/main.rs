use log::debug;
use recipe_gateway::{GatewayConfig, GatewayRequest, RecipeGateway};
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::init();

    // Get the URL from command-line arguments
    let args: Vec<String> = env::args().collect();
    let url = args.get(1).ok_or("Usage: recipe-gateway <recipe-url>")?;

    let config = GatewayConfig::load()?;
    debug!("{:#?}", config);
    let gateway = RecipeGateway::with_request_fetcher(config)?;

    let request = GatewayRequest::post_url(url).with_peer_addr(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let response = gateway.handle(request).await;

    eprintln!("HTTP {}", response.status);
    for (name, value) in response.headers().iter() {
        eprintln!("{}: {}", name, value.to_str().unwrap_or_default());
    }
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if response.status.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
