use presenceforge::{ActivityBuilder, ClientBuilder, MessageKind, Result};
use std::time::Duration;

/// Demonstrates manual-dispatch mode: polling `invoke()` for join requests
/// and accepting them, instead of registering an Auto-mode callback.
fn main() -> Result {
    env_logger::init();

    let client_id = std::env::var("DISCORD_CLIENT_ID").unwrap_or_else(|_| {
        eprintln!("Error: DISCORD_CLIENT_ID is required!");
        std::process::exit(1);
    });

    let client = ClientBuilder::new(&client_id).build()?;
    client.initialize()?;

    let activity = ActivityBuilder::new()
        .state("Waiting for friends")
        .details("Open lobby")
        .join_secret("lobby-1234")
        .party("lobby-1234", 1, 4)
        .build();
    client.set_presence(Some(activity))?;

    for _ in 0..60 {
        for message in client.invoke()? {
            if let MessageKind::JoinRequest { user, .. } = message.kind {
                println!("accepting join request from {}", user.id);
                client.respond(user.id, true)?;
            }
        }
        std::thread::sleep(Duration::from_secs(1));
    }

    Ok(())
}
