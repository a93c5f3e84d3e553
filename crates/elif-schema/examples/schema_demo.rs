//! Walkthrough of field schemas, record schemas and async rules

use elif_schema::{any, array, number, object, reference, string, ObjectOptions, Validation};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=elif_schema=trace shows each rejected rule
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🦀 elif-schema Demo");
    println!("====================\n");

    demo_field_schemas()?;
    demo_record_schemas()?;
    demo_async_rules().await?;

    println!("✅ All schema demos completed successfully!");
    Ok(())
}

fn report(label: &str, outcome: &Validation) {
    match &outcome.error {
        None => println!("  ✅ {} -> {}", label, display(&outcome.value)),
        Some(error) => println!("  ❌ {} -> {}", label, error),
    }
}

fn display(value: &Option<serde_json::Value>) -> String {
    value.as_ref().map_or_else(|| "<absent>".to_string(), |v| v.to_string())
}

fn demo_field_schemas() -> Result<(), Box<dyn std::error::Error>> {
    println!("📝 Demo 1: Field Schemas");
    println!("------------------------");

    let username = string().trim().lowercase().min(3).token().required();
    report("'  USER_123 '", &username.validate(json!("  USER_123 "))?);
    report("missing username", &username.validate(None)?);

    let port = number().port().default(8080);
    report("no port", &port.validate(None)?);
    report("port 70000", &port.validate(json!(70000))?);

    let card = string().credit_card().message("card number looks wrong");
    report("'49927398716'", &card.validate(json!("49927398716"))?);
    report("'49927398717'", &card.validate(json!("49927398717"))?);

    let tags = array().single().items(string().alphanum()).unique();
    report("'rust'", &tags.validate(json!("rust"))?);
    report("['a', 'b!']", &tags.validate(json!(["a", "b!"]))?);

    println!();
    Ok(())
}

fn demo_record_schemas() -> Result<(), Box<dyn std::error::Error>> {
    println!("📋 Demo 2: Record Schemas");
    println!("-------------------------");

    let booking = object([
        ("guest", any().keys([("name", string().required()), ("email", string().email())])),
        ("nights", number().integer().positive().required()),
        ("max_nights", number().integer()),
        ("promo", string().uppercase().strip()),
    ])
    .field("stay", number().max(reference("max_nights")))
    .xor(["email", "phone"])
    .with_options(ObjectOptions::default().abort_early(false));

    let good = json!({
        "guest": {"name": "Ada", "email": "ada@example.com"},
        "nights": 2,
        "max_nights": 5,
        "stay": 3,
        "promo": "spring",
        "email": "ada@example.com"
    });
    report("complete booking", &booking.validate(good)?);

    let bad = json!({
        "guest": {"email": "nope"},
        "nights": 0,
        "max_nights": 2,
        "stay": 3
    });
    let outcome = booking.validate(bad)?;
    report("broken booking", &outcome);
    if let Some(error) = outcome.error {
        println!("  📦 {}", error.to_json());
    }

    println!();
    Ok(())
}

async fn demo_async_rules() -> Result<(), Box<dyn std::error::Error>> {
    println!("⏳ Demo 3: Async Rules");
    println!("----------------------");

    let taken = ["admin", "root"];
    let signup = object([(
        "username",
        string()
            .required()
            .custom_async(move |value, _| async move {
                !taken.iter().any(|name| value.as_str() == Some(*name))
            })
            .message("is already taken"),
    )]);

    match signup.validate(json!({"username": "ada"})) {
        Ok(_) => println!("  ❌ sync validation should refuse async rules"),
        Err(error) => println!("  ✅ sync validation refused: {}", error),
    }

    report("'ada'", &signup.validate_async(json!({"username": "ada"})).await?);
    report("'root'", &signup.validate_async(json!({"username": "root"})).await?);

    println!();
    Ok(())
}
