use std::time::Duration;

use rand::thread_rng;
use serenity::client::Context;
use serenity::framework::standard::macros::{command, group};
use serenity::framework::standard::{Args, CommandResult};
use serenity::model::channel::Message;
use tokio::time::Instant;
use tracing::info;

use crate::betrayal::{player_count, roster, Picker};
use crate::chat::check_msg;
use crate::dice::{self, RollRequest, MAX_ROLLS};

const PICK_TIMEOUT: Duration = Duration::from_secs(15);

#[group]
#[commands(roll, flip, betrayal)]
struct Games;

#[command]
async fn roll(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    if let Some(reply) = roll_reply(args.rest()) {
        check_msg(msg.channel_id.say(&ctx.http, reply).await);
    }

    Ok(())
}

fn roll_reply(notation: &str) -> Option<String> {
    match dice::parse(notation) {
        RollRequest::Roll { rolls, limit } => Some(dice::roll(rolls, limit, &mut thread_rng()).to_string()),
        RollRequest::Ignored => None,
        RollRequest::TooMany => Some(format!("Can't roll more than {MAX_ROLLS} dice at once")),
        RollRequest::BadFormat => Some("Format has to be in NdN!".to_string()),
    }
}

#[command]
async fn flip(ctx: &Context, msg: &Message) -> CommandResult {
    let side = dice::flip(&mut thread_rng());

    check_msg(msg.channel_id.say(&ctx.http, side).await);

    Ok(())
}

/// Walks every player through picking a Betrayal at House on the Hill character.
#[command]
#[only_in(guilds)]
async fn betrayal(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let players = match args.single::<i64>().map_err(|_| "Must end with number greater then 0").and_then(player_count) {
        Ok(players) => players,
        Err(reply) => {
            check_msg(msg.channel_id.say(&ctx.http, reply).await);
            return Ok(());
        }
    };

    info!("Starting betrayal setup for {players} players");

    check_msg(msg.channel_id.say(&ctx.http, roster()).await);

    let mut picker = Picker::default();

    for player in 1..=players {
        check_msg(
            msg.channel_id
                .say(&ctx.http, format!("Enter character number for player {player}"))
                .await,
        );

        if !await_pick(ctx, msg, &mut picker).await {
            check_msg(msg.channel_id.say(&ctx.http, "No value given. Exiting...").await);
            return Ok(());
        }
    }

    check_msg(msg.channel_id.say(&ctx.http, picker.summary()).await);

    Ok(())
}

/// Waits for a valid pick, reporting rejected ones. `false` once the time for this player runs out.
async fn await_pick(ctx: &Context, msg: &Message, picker: &mut Picker) -> bool {
    let deadline = Instant::now() + PICK_TIMEOUT;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());

        if remaining.is_zero() {
            return false;
        }

        let Some(reply) = msg.channel_id.await_reply(ctx).timeout(remaining).await else {
            return false;
        };

        if reply.author.bot {
            continue;
        }

        match picker.pick(&reply.content) {
            Ok(character) => {
                info!("Picked {}", character.name);
                return true;
            }
            Err(why) => check_msg(msg.channel_id.say(&ctx.http, why.to_string()).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_replies() {
        assert_eq!(roll_reply("0d6"), None);
        assert_eq!(roll_reply("6"), Some("Format has to be in NdN!".to_string()));
        assert_eq!(roll_reply("500d6"), Some("Can't roll more than 100 dice at once".to_string()));
        assert_eq!(roll_reply("1d1"), Some("1".to_string()));
        assert_eq!(roll_reply("3d1"), Some("1 + 1 + 1 = 3".to_string()));
    }
}
