//! Walks through every Kennwort API call.
//!
//! Usage:
//! ```text
//! KENNWORT_TOKEN=... cargo run --example send -- <template> <email> <sender-id>
//! ```
//! Set `RUST_LOG=kennwort_client=debug` to see the requests.

use kennwort_client::{Client, Page};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let token = std::env::var("KENNWORT_TOKEN").unwrap_or_default();
    let mut args = std::env::args().skip(1);
    let template = args.next().unwrap_or_else(|| "welcome".to_string());
    let email = args.next().unwrap_or_else(|| "test@example.com".to_string());
    let sender_id = args.next();

    let client = Client::new(token)?;

    println!("📋 Senders:");
    let senders = client.list_senders(Page::default()).await?;
    println!("{}", serde_json::to_string_pretty(&senders)?);

    println!("\n📋 Templates:");
    let templates = client.list_templates(Page::default()).await?;
    println!("{}", serde_json::to_string_pretty(&templates)?);

    println!("\n📬 Sending template '{template}' to {email}...");
    let sent = client
        .send_template_email(&template, email.as_str(), &json!({ "name": "Demo" }))
        .await?;
    println!("{}", serde_json::to_string_pretty(&sent)?);

    if let Some(id) = sent.get("id").and_then(|v| v.as_str()) {
        println!("\n🔎 Status of {id}:");
        let status = client.get_email_status(id).await?;
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    if let Some(sender_id) = sender_id {
        println!("\n📬 Sending raw email from sender {sender_id}...");
        let sent = client
            .send_raw_email(
                &sender_id,
                (email.as_str(), "Demo"),
                "Hello from kennwort-client",
                "<p>It works.</p>",
            )
            .await?;
        println!("{}", serde_json::to_string_pretty(&sent)?);
    }

    Ok(())
}
