//! Pirate Example
//!
//! The smallest useful chat: one instruction, one exchange, no tools.
//!
//! Needs `OPENAI_API_KEY` (and optionally `OPENAI_BASE_URL`) in the environment.

use toolchat::Chat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut chat = Chat::from_env()?;
    chat.instruction("Talk like a pirate. A cool pirate.");

    let answer = chat.exchange("Tell me how to cook scrambled eggs.").await?;
    println!("{}", answer);

    Ok(())
}
