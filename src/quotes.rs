use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serenity::prelude::TypeMapKey;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{BotError, BotResult};
use crate::files::write_atomic_async;

#[derive(Serialize, Deserialize)]
struct QuoteRecord {
    user: String,
    quote: String,
}

/// Quotes keyed by lowercased user name. A user is present only while they have quotes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Quotes {
    by_user: BTreeMap<String, Vec<String>>,
    /// User key of every stored quote, in the order the quotes were added.
    added_order: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub enum Added {
    FirstForUser,
    Appended,
}

#[derive(Debug, PartialEq)]
pub enum Removed {
    NoSuchUser,
    NoSuchQuote,
    Quote,
    LastQuote,
}

impl Quotes {
    /// Reads one JSON record per line, in insertion order.
    pub fn parse(text: &str) -> BotResult<Self> {
        let mut quotes = Quotes::default();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let record: QuoteRecord =
                serde_json::from_str(line).map_err(|source| BotError::QuoteRecord { line: index + 1, source })?;

            quotes.add(&record.user, &record.quote);
        }

        Ok(quotes)
    }

    pub fn to_lines(&self) -> BotResult<String> {
        let mut text = String::new();
        let mut next: HashMap<&str, usize> = HashMap::new();

        for user in &self.added_order {
            let cursor = next.entry(user.as_str()).or_default();

            let Some(quote) = self.by_user.get(user).and_then(|quotes| quotes.get(*cursor)) else {
                continue;
            };
            *cursor += 1;

            let record = QuoteRecord {
                user: user.clone(),
                quote: quote.clone(),
            };
            text.push_str(&serde_json::to_string(&record)?);
            text.push('\n');
        }

        Ok(text)
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    pub fn add(&mut self, user: &str, quote: &str) -> Added {
        let key = user.to_lowercase();
        let quotes = self.by_user.entry(key.clone()).or_default();
        quotes.push(quote.to_string());
        self.added_order.push(key);

        if quotes.len() == 1 {
            Added::FirstForUser
        } else {
            Added::Appended
        }
    }

    pub fn remove_user(&mut self, user: &str) -> bool {
        let key = user.to_lowercase();
        self.added_order.retain(|added| *added != key);

        self.by_user.remove(&key).is_some()
    }

    pub fn remove_quote(&mut self, user: &str, quote: &str) -> Removed {
        let key = user.to_lowercase();

        let Some(quotes) = self.by_user.get_mut(&key) else {
            return Removed::NoSuchUser;
        };

        let Some(position) = quotes.iter().position(|candidate| candidate == quote) else {
            return Removed::NoSuchQuote;
        };

        quotes.remove(position);

        let order_index = self
            .added_order
            .iter()
            .enumerate()
            .filter(|(_, added)| **added == key)
            .nth(position)
            .map(|(index, _)| index);

        if let Some(index) = order_index {
            self.added_order.remove(index);
        }

        if quotes.is_empty() {
            self.by_user.remove(&key);
            Removed::LastQuote
        } else {
            Removed::Quote
        }
    }

    pub fn for_user(&self, user: &str) -> Option<&[String]> {
        self.by_user.get(&user.to_lowercase()).map(Vec::as_slice)
    }

    pub fn users(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.by_user.iter().map(|(user, quotes)| (user.as_str(), quotes.as_slice()))
    }

    /// A random user, then one of their quotes.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&str, &str)> {
        let (user, quotes) = self.by_user.iter().choose(rng)?;
        let quote = quotes.choose(rng)?;

        Some((user.as_str(), quote.as_str()))
    }

    pub fn random_for<R: Rng + ?Sized>(&self, user: &str, rng: &mut R) -> Option<&str> {
        self.for_user(user)?.choose(rng).map(String::as_str)
    }
}

/// The quote file. Every access loads it in full; every change rewrites it in full.
pub struct QuoteStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TypeMapKey for QuoteStore {
    type Value = Arc<QuoteStore>;
}

impl QuoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> BotResult<Quotes> {
        let _guard = self.lock.lock().await;

        self.read().await
    }

    /// Loads, applies `change` and writes the result back atomically.
    pub async fn update<T>(&self, change: impl FnOnce(&mut Quotes) -> T) -> BotResult<T> {
        let _guard = self.lock.lock().await;

        let mut quotes = self.read().await?;
        let outcome = change(&mut quotes);
        self.write(&quotes).await?;

        Ok(outcome)
    }

    pub async fn reset(&self) -> BotResult<()> {
        let _guard = self.lock.lock().await;

        info!("Resetting quotes in {}", self.path.display());

        self.write(&Quotes::default()).await
    }

    async fn read(&self) -> BotResult<Quotes> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Quotes::parse(&text),
            Err(why) if why.kind() == io::ErrorKind::NotFound => Ok(Quotes::default()),
            Err(why) => Err(why.into()),
        }
    }

    async fn write(&self, quotes: &Quotes) -> BotResult<()> {
        let contents = quotes.to_lines()?;

        Ok(write_atomic_async(&self.path, contents.into_bytes()).await?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn adding_reports_first_quote_per_user() {
        let mut quotes = Quotes::default();

        assert_eq!(quotes.add("Bob", "Hello there"), Added::FirstForUser);
        assert_eq!(quotes.add("BOB", "General Kenobi"), Added::Appended);
        assert_eq!(quotes.for_user("bob").unwrap(), ["Hello there", "General Kenobi"]);
    }

    #[test]
    fn removing_last_quote_removes_user() {
        let mut quotes = Quotes::default();
        quotes.add("bob", "only one");

        assert_eq!(quotes.remove_quote("bob", "missing"), Removed::NoSuchQuote);
        assert_eq!(quotes.remove_quote("bob", "only one"), Removed::LastQuote);
        assert_eq!(quotes.for_user("bob"), None);
        assert!(quotes.is_empty());
        assert_eq!(quotes.remove_quote("bob", "only one"), Removed::NoSuchUser);
    }

    #[test]
    fn removing_one_of_many_keeps_user() {
        let mut quotes = Quotes::default();
        quotes.add("amy", "one");
        quotes.add("amy", "two");

        assert_eq!(quotes.remove_quote("Amy", "one"), Removed::Quote);
        assert_eq!(quotes.for_user("amy").unwrap(), ["two"]);
        assert!(quotes.remove_user("AMY"));
        assert!(!quotes.remove_user("amy"));
    }

    #[test]
    fn random_picks_from_stored_quotes() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut quotes = Quotes::default();

        assert_eq!(quotes.random(&mut rng), None);

        quotes.add("amy", "one");
        quotes.add("bob", "two");

        for _ in 0..20 {
            let (user, quote) = quotes.random(&mut rng).unwrap();
            assert!(quotes.for_user(user).unwrap().iter().any(|q| q == quote));
        }

        assert_eq!(quotes.random_for("Bob", &mut rng), Some("two"));
        assert_eq!(quotes.random_for("carl", &mut rng), None);
    }

    #[test]
    fn file_keeps_the_order_quotes_were_added_in() {
        let mut quotes = Quotes::default();
        quotes.add("bob", "first");
        quotes.add("amy", "second");
        quotes.add("bob", "third");

        assert_eq!(
            quotes.to_lines().unwrap(),
            "{\"user\":\"bob\",\"quote\":\"first\"}\n\
             {\"user\":\"amy\",\"quote\":\"second\"}\n\
             {\"user\":\"bob\",\"quote\":\"third\"}\n"
        );

        quotes.remove_quote("bob", "first");

        assert_eq!(
            quotes.to_lines().unwrap(),
            "{\"user\":\"amy\",\"quote\":\"second\"}\n\
             {\"user\":\"bob\",\"quote\":\"third\"}\n"
        );
        assert_eq!(Quotes::parse(&quotes.to_lines().unwrap()).unwrap(), quotes);
    }

    #[test]
    fn corrupt_line_is_reported_with_its_number() {
        let text = "{\"user\":\"amy\",\"quote\":\"one\"}\n{oops\n";

        match Quotes::parse(text) {
            Err(BotError::QuoteRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path().join("quotes.jsonl"));

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_then_list_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.jsonl");
        let store = QuoteStore::new(&path);

        let added = store.update(|quotes| quotes.add("Dave", "I'm sorry")).await.unwrap();
        assert_eq!(added, Added::FirstForUser);

        let reopened = QuoteStore::new(&path).load().await.unwrap();
        assert_eq!(reopened.for_user("dave").unwrap(), ["I'm sorry"]);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"user\":\"dave\",\"quote\":\"I'm sorry\"}\n"
        );
    }

    #[tokio::test]
    async fn deleting_only_quote_removes_user_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path().join("quotes.jsonl"));

        store.update(|quotes| quotes.add("dave", "open the pod bay doors")).await.unwrap();
        let removed = store
            .update(|quotes| quotes.remove_quote("dave", "open the pod bay doors"))
            .await
            .unwrap();

        assert_eq!(removed, Removed::LastQuote);
        assert!(store.load().await.unwrap().users().next().is_none());
    }

    #[tokio::test]
    async fn reset_empties_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path().join("quotes.jsonl"));

        store.update(|quotes| quotes.add("eve", "hi")).await.unwrap();
        store.reset().await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }
}
