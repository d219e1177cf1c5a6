use presenceforge::{ActivityBuilder, ClientBuilder, Result};
use std::time::Duration;

/// Discord Rich Presence Basic Example
fn main() -> Result {
    env_logger::init();

    let client_id = std::env::var("DISCORD_CLIENT_ID").unwrap_or_else(|_| {
        eprintln!("Error: DISCORD_CLIENT_ID is required!");
        eprintln!("  DISCORD_CLIENT_ID=YOUR_ID cargo run --example basic");
        std::process::exit(1);
    });

    let client = ClientBuilder::new(&client_id).build()?;
    client.initialize()?;

    let activity = ActivityBuilder::new()
        .state("Playing a game")
        .details("In the menu")
        .start_timestamp_now()?
        .large_image("car")
        .large_text("This is a large image")
        .button("View Car", "https://google.com")
        .button("Documentation", "https://docs.rs/presenceforge")
        .build();

    client.set_presence(Some(activity))?;

    std::thread::sleep(Duration::from_secs(30));

    client.clear_presence()?;

    // The engine is disposed when the client (and its last clone) is dropped.
    Ok(())
}
