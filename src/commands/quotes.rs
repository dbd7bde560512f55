use rand::thread_rng;
use serenity::client::Context;
use serenity::framework::standard::macros::{command, group};
use serenity::framework::standard::{Args, CommandResult};
use serenity::model::channel::Message;

use crate::chat::{capitalize, check_msg, collapse_whitespace, say_chunked, upper_first};
use crate::commands::shared;
use crate::commands::speech::speak;
use crate::config::BotConfig;
use crate::quotes::{Added, QuoteStore, Quotes, Removed};
use crate::speech::Voice;

const NO_QUOTES: &str = "There are no quotes yet";

#[group]
#[only_in(guilds)]
#[commands(quote, quotes, quoted, qlist, qcheck, resetquotes)]
struct Quoting;

/// Arguments of `quote`, `quotes` and `quoted`: an optional name, then an optional quote.
#[derive(Debug, PartialEq)]
enum QuoteArgs {
    Nothing,
    User(String),
    UserQuote(String, String),
}

impl QuoteArgs {
    fn parse(input: &str) -> Self {
        let input = collapse_whitespace(input);

        match input.split_once(' ') {
            Some((user, quote)) => QuoteArgs::UserQuote(user.to_string(), upper_first(quote)),
            None if input.is_empty() => QuoteArgs::Nothing,
            None => QuoteArgs::User(input),
        }
    }
}

fn format_quote(user: &str, quote: &str) -> String {
    format!("***'{quote}'*** *- {}*", capitalize(user))
}

#[command]
async fn quote(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    quote_or_add(ctx, msg, &args, false).await
}

/// Same as `quote`, and speaks whatever it shows.
#[command]
async fn quotes(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    quote_or_add(ctx, msg, &args, true).await
}

async fn quote_or_add(ctx: &Context, msg: &Message, args: &Args, aloud: bool) -> CommandResult {
    let store = shared::<QuoteStore>(ctx).await?;

    let shown = match QuoteArgs::parse(args.rest()) {
        QuoteArgs::Nothing => {
            let quotes = store.load().await?;
            let picked = quotes
                .random(&mut thread_rng())
                .map(|(user, quote)| (user.to_string(), quote.to_string()));

            picked.ok_or_else(|| NO_QUOTES.to_string())
        }
        QuoteArgs::User(user) => {
            let quotes = store.load().await?;
            let picked = quotes.random_for(&user, &mut thread_rng()).map(str::to_string);

            picked
                .map(|quote| (user.clone(), quote))
                .ok_or_else(|| format!("{} does not have any quotes", capitalize(&user)))
        }
        QuoteArgs::UserQuote(user, quote) => {
            let added = store.update(|quotes| quotes.add(&user, &quote)).await?;

            let reply = match added {
                Added::FirstForUser => format!("There is now quotes for {}", capitalize(&user)),
                Added::Appended => format!("Added quote for {}", capitalize(&user)),
            };

            Err(reply)
        }
    };

    match shown {
        Ok((user, quote)) => {
            check_msg(msg.channel_id.say(&ctx.http, format_quote(&user, &quote)).await);

            if aloud {
                speak(ctx, msg, &format!("{user} said {quote}"), Voice::English).await?;
            }
        }
        Err(reply) => check_msg(msg.channel_id.say(&ctx.http, reply).await),
    }

    Ok(())
}

#[command]
async fn quoted(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let store = shared::<QuoteStore>(ctx).await?;

    let reply = match QuoteArgs::parse(args.rest()) {
        QuoteArgs::Nothing => "Please enter a name after to delete that name's quotes".to_string(),
        QuoteArgs::User(user) => {
            if store.update(|quotes| quotes.remove_user(&user)).await? {
                format!("Quotes for {} have been deleted", capitalize(&user))
            } else {
                format!("{} does not have any quotes", capitalize(&user))
            }
        }
        QuoteArgs::UserQuote(user, quote) => {
            let removed = store.update(|quotes| quotes.remove_quote(&user, &quote)).await?;
            removal_reply(&user, removed)
        }
    };

    check_msg(msg.channel_id.say(&ctx.http, reply).await);

    Ok(())
}

fn removal_reply(user: &str, removed: Removed) -> String {
    let user = capitalize(user);

    match removed {
        Removed::NoSuchUser => format!("{user} does not have any quotes"),
        Removed::NoSuchQuote => format!("{user} does not have that quote"),
        Removed::Quote => format!("Quote removed from {user}"),
        Removed::LastQuote => format!("Quotes for {user} have been deleted"),
    }
}

#[command]
async fn qlist(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let store = shared::<QuoteStore>(ctx).await?;

    let reply = match QuoteArgs::parse(args.rest()) {
        QuoteArgs::Nothing => all_quotes_listing(&store.load().await?),
        QuoteArgs::User(user) => user_quotes_listing(&store.load().await?, &user),
        QuoteArgs::UserQuote(..) => {
            let prefix = shared::<BotConfig>(ctx).await?.prefix.clone();
            format!("Enter only a name after {prefix}qlist to see that person's quotes")
        }
    };

    say_chunked(&ctx.http, msg.channel_id, &reply).await;

    Ok(())
}

fn all_quotes_listing(quotes: &Quotes) -> String {
    if quotes.is_empty() {
        return NO_QUOTES.to_string();
    }

    let mut reply = String::new();

    for (user, user_quotes) in quotes.users() {
        reply.push_str(&format!("\n{}:\n", capitalize(user)));

        for quote in user_quotes {
            reply.push_str(quote);
            reply.push('\n');
        }
    }

    reply
}

fn user_quotes_listing(quotes: &Quotes, user: &str) -> String {
    match quotes.for_user(user) {
        Some(user_quotes) => format!("{}:\n{}\n", capitalize(user), user_quotes.join("\n")),
        None => format!("{} does not have any quotes", capitalize(user)),
    }
}

#[command]
async fn qcheck(ctx: &Context, msg: &Message) -> CommandResult {
    let quotes = shared::<QuoteStore>(ctx).await?.load().await?;

    say_chunked(&ctx.http, msg.channel_id, &quote_counts(&quotes)).await;

    Ok(())
}

fn quote_counts(quotes: &Quotes) -> String {
    if quotes.is_empty() {
        return NO_QUOTES.to_string();
    }

    quotes
        .users()
        .map(|(user, user_quotes)| format!("{}: {}", capitalize(user), user_quotes.len()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[command]
#[required_permissions("ADMINISTRATOR")]
async fn resetquotes(ctx: &Context, msg: &Message) -> CommandResult {
    shared::<QuoteStore>(ctx).await?.reset().await?;

    check_msg(msg.channel_id.say(&ctx.http, "All quotes have been deleted").await);

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> Quotes {
        let mut quotes = Quotes::default();
        quotes.add("tom", "Hello there");
        quotes.add("tom", "General Kenobi");
        quotes.add("ANNA", "Nope");
        quotes
    }

    #[test]
    fn args_split_name_from_quote() {
        assert_eq!(QuoteArgs::parse("   "), QuoteArgs::Nothing);
        assert_eq!(QuoteArgs::parse(" tom "), QuoteArgs::User("tom".to_string()));
        assert_eq!(
            QuoteArgs::parse("tom   i   have   the high ground"),
            QuoteArgs::UserQuote("tom".to_string(), "I have the high ground".to_string())
        );
    }

    #[test]
    fn quote_formatting_capitalizes_user() {
        assert_eq!(format_quote("tOM", "Hello there"), "***'Hello there'*** *- Tom*");
    }

    #[test]
    fn removal_replies() {
        assert_eq!(removal_reply("tom", Removed::NoSuchUser), "Tom does not have any quotes");
        assert_eq!(removal_reply("tom", Removed::NoSuchQuote), "Tom does not have that quote");
        assert_eq!(removal_reply("tom", Removed::Quote), "Quote removed from Tom");
        assert_eq!(removal_reply("tom", Removed::LastQuote), "Quotes for Tom have been deleted");
    }

    #[test]
    fn listings_group_by_user() {
        let quotes = sample();

        assert_eq!(all_quotes_listing(&quotes), "\nAnna:\nNope\n\nTom:\nHello there\nGeneral Kenobi\n");
        assert_eq!(user_quotes_listing(&quotes, "TOM"), "Tom:\nHello there\nGeneral Kenobi\n");
        assert_eq!(user_quotes_listing(&quotes, "bob"), "Bob does not have any quotes");
        assert_eq!(quote_counts(&quotes), "Anna: 1\nTom: 2");
    }

    #[test]
    fn empty_store_listings() {
        let quotes = Quotes::default();

        assert_eq!(all_quotes_listing(&quotes), NO_QUOTES);
        assert_eq!(quote_counts(&quotes), NO_QUOTES);
    }
}
