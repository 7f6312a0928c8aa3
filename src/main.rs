use std::sync::Arc;

use taskflow_client::auth::GuardDecision;
use taskflow_client::config::{load_config, print_schema};
use taskflow_client::startup;
use taskflow_client::utils::logger::init_logging;
use tracing::error;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Failed to print schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = Arc::new(load_config());
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialise logging: {}", e);
        std::process::exit(1);
    }

    match startup::run(config, &args).await {
        Ok((status, decisions)) => {
            println!("session: {:?}", status);
            for (path, decision) in decisions {
                match decision {
                    GuardDecision::Admit => println!("{} -> admit", path),
                    GuardDecision::Pending => println!("{} -> pending", path),
                    GuardDecision::Redirect { to, return_to } => {
                        println!("{} -> redirect {} (return to {})", path, to, return_to)
                    }
                }
            }
        }
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    }
}
