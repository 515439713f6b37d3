//! Game Master Example
//!
//! The model plays the GM of a role playing game and rolls dice through a
//! tool. Each roll is printed as it happens, before the narration arrives.
//!
//! Run with `RUST_LOG=toolchat=debug` to see every request and tool call.

use rand::Rng;
use serde::Deserialize;
use toolchat::{Chat, Describe, Schema, tool};

#[derive(Deserialize)]
struct RollDie {
    max_value: u32,
}

impl Describe for RollDie {
    fn describe() -> Schema {
        Schema::object().field(
            "max_value",
            u32::describe().with_description("number of sides of the die"),
        )
    }
}

fn roll_die(args: RollDie) -> Result<u32, String> {
    if args.max_value == 0 {
        return Err("max_value must be at least 1".to_string());
    }
    let value = rand::thread_rng().gen_range(1..=args.max_value);
    println!("[Rolled a {}]", value);
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let roll = tool(
        "roll_die",
        "Returns a random number between 1 and max_value (inclusive).",
    )
    .build(roll_die)?;

    let mut chat = Chat::from_env()?.with_tool(roll)?;
    chat.instruction("You are GM of a role playing game.");

    let answer = chat
        .exchange("I swing my sword against the goblin, for 1d10 damage.")
        .await?;
    println!("{}", answer);

    Ok(())
}
