use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "verify-cli")]
#[command(about = "Command line client for the Purchase Verifier API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait until an item is marked sold to a payment intent
    Item {
        item_id: String,
        payment_intent_id: String,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Wait until a purchase record exists
    Purchase {
        product_id: String,
        payment_intent_id: String,
        buyer_id: String,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Check an item once, without polling
    ItemStatus {
        item_id: String,
        payment_intent_id: String,
    },
    /// Check for a purchase record once, without polling
    PurchaseStatus {
        product_id: String,
        payment_intent_id: String,
        buyer_id: String,
    },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Item {
            item_id,
            payment_intent_id,
            max_attempts,
        } => {
            client
                .post(format!("{}/api/v1/verify/item", base))
                .json(&json!({
                    "item_id": item_id,
                    "payment_intent_id": payment_intent_id,
                    "max_attempts": max_attempts,
                }))
                .send()
                .await?
        }
        Commands::Purchase {
            product_id,
            payment_intent_id,
            buyer_id,
            max_attempts,
        } => {
            client
                .post(format!("{}/api/v1/verify/purchase", base))
                .json(&json!({
                    "product_id": product_id,
                    "payment_intent_id": payment_intent_id,
                    "buyer_id": buyer_id,
                    "max_attempts": max_attempts,
                }))
                .send()
                .await?
        }
        Commands::ItemStatus {
            item_id,
            payment_intent_id,
        } => {
            client
                .get(format!("{}/api/v1/status/item/{}", base, item_id))
                .query(&[("payment_intent_id", payment_intent_id)])
                .send()
                .await?
        }
        Commands::PurchaseStatus {
            product_id,
            payment_intent_id,
            buyer_id,
        } => {
            client
                .get(format!("{}/api/v1/status/purchase", base))
                .query(&[
                    ("product_id", product_id),
                    ("payment_intent_id", payment_intent_id),
                    ("buyer_id", buyer_id),
                ])
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: verifier returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
