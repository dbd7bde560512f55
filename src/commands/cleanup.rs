use serenity::client::Context;
use serenity::framework::standard::macros::command;
use serenity::framework::standard::CommandResult;
use serenity::http::HttpError;
use serenity::model::channel::Message;
use serenity::model::id::MessageId;
use serenity::model::ModelError;
use tracing::warn;

use crate::chat::check_msg;
use crate::commands::shared;
use crate::config::BotConfig;

const SCANNED_MESSAGES: u64 = 100;
/// Discord refuses to bulk delete anything older than two weeks.
const MAX_AGE_SECS: i64 = 13 * 24 * 60 * 60;

/// Removes recent bot replies and commands from the channel.
#[command]
#[only_in(guilds)]
async fn cleanup(ctx: &Context, msg: &Message) -> CommandResult {
    let prefix = shared::<BotConfig>(ctx).await?.prefix.clone();

    match delete_recent(ctx, msg, &prefix).await {
        Ok(deleted) => {
            check_msg(msg.channel_id.say(&ctx.http, format!("Deleted {deleted} message(s)")).await);
        }
        Err(why) if is_forbidden(&why) => {
            warn!("Cleanup refused: {why:?}");
            check_msg(msg.channel_id.say(&ctx.http, "Need extra permissions to clean up").await);
        }
        Err(why) => return Err(why.into()),
    }

    Ok(())
}

async fn delete_recent(ctx: &Context, msg: &Message, prefix: &str) -> serenity::Result<usize> {
    let bot_id = ctx.cache.current_user_id();
    let now = chrono::Utc::now().timestamp();

    let messages = msg
        .channel_id
        .messages(&ctx.http, |retriever| retriever.limit(SCANNED_MESSAGES))
        .await?;

    let doomed: Vec<MessageId> = messages
        .iter()
        .filter(|message| {
            let age_secs = now - message.timestamp.unix_timestamp();
            is_cleanable(message.author.id == bot_id, &message.content, prefix, age_secs)
        })
        .map(|message| message.id)
        .collect();

    match doomed.as_slice() {
        [] => {}
        [single] => msg.channel_id.delete_message(&ctx.http, *single).await?,
        many => msg.channel_id.delete_messages(&ctx.http, many.iter().copied()).await?,
    }

    Ok(doomed.len())
}

fn is_cleanable(by_bot: bool, content: &str, prefix: &str, age_secs: i64) -> bool {
    age_secs < MAX_AGE_SECS && (by_bot || content.starts_with(prefix))
}

fn is_forbidden(why: &serenity::Error) -> bool {
    match why {
        serenity::Error::Http(http) => matches!(
            http.as_ref(),
            HttpError::UnsuccessfulRequest(response) if response.status_code.as_u16() == 403
        ),
        serenity::Error::Model(ModelError::InvalidPermissions(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serenity::model::Permissions;

    use super::*;

    #[test]
    fn only_recent_bot_messages_and_commands_are_cleaned() {
        assert!(is_cleanable(true, "Queued song", "!", 60));
        assert!(is_cleanable(false, "!play song", "!", 60));
        assert!(!is_cleanable(false, "hello !play", "!", 60));
        assert!(!is_cleanable(true, "Queued song", "!", MAX_AGE_SECS + 1));
    }

    #[test]
    fn missing_permissions_are_recognised() {
        let denied = serenity::Error::Model(ModelError::InvalidPermissions(Permissions::MANAGE_MESSAGES));

        assert!(is_forbidden(&denied));
        assert!(!is_forbidden(&serenity::Error::Other("boom")));
    }
}
