//! Token vocabulary shared by topic-model fitting and projection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Token -> id mapping.
///
/// The vocabulary only grows while a corpus is being fitted
/// ([`doc2bow_update`](Dictionary::doc2bow_update)); projection uses
/// [`doc2bow`](Dictionary::doc2bow), which ignores unseen tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Dictionary {
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token has been seen.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Id of `token`, if known.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    /// Token with the given id.
    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Bag-of-words for `tokens`, sorted by id. Unknown tokens are dropped.
    pub fn doc2bow(&self, tokens: &[String]) -> Vec<(u32, u32)> {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for id in tokens.iter().filter_map(|t| self.id(t)) {
            *counts.entry(id).or_default() += 1;
        }
        sorted(counts)
    }

    /// Bag-of-words for `tokens`, assigning fresh ids to unseen tokens.
    pub fn doc2bow_update(&mut self, tokens: &[String]) -> Vec<(u32, u32)> {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for token in tokens {
            let id = match self.ids.get(token) {
                Some(&id) => id,
                None => {
                    let id = self.tokens.len() as u32;
                    self.tokens.push(token.clone());
                    self.ids.insert(token.clone(), id);
                    id
                }
            };
            *counts.entry(id).or_default() += 1;
        }
        sorted(counts)
    }
}

fn sorted(counts: HashMap<u32, u32>) -> Vec<(u32, u32)> {
    let mut bow: Vec<(u32, u32)> = counts.into_iter().collect();
    bow.sort_unstable_by_key(|&(id, _)| id);
    bow
}

impl From<Vec<String>> for Dictionary {
    fn from(tokens: Vec<String>) -> Self {
        let ids = tokens.iter().enumerate().map(|(i, t)| (t.clone(), i as u32)).collect();
        Self { tokens, ids }
    }
}

impl From<Dictionary> for Vec<String> {
    fn from(dictionary: Dictionary) -> Self {
        dictionary.tokens
    }
}
