//! Ordered command table with first-match-wins dispatch

use std::sync::Arc;

use super::matcher;
use crate::scenario::Scenario;
use crate::{Error, Result};

/// Name of the built-in catch-all binding
pub const CATCH_ALL: &str = "echo";

/// What a matched binding does
#[derive(Clone)]
pub enum Action {
    /// Run one scenario cycle
    Scenario(Arc<dyn Scenario>),
    /// Run scenario cycles one after another
    Sequence(Vec<Arc<dyn Scenario>>),
    /// Start the chained flow of this kind
    Chain(String),
    /// Speak the transcript back and show it
    Echo,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scenario(s) => f.debug_tuple("Scenario").field(&s.name()).finish(),
            Self::Sequence(list) => f
                .debug_tuple("Sequence")
                .field(&list.iter().map(|s| s.name()).collect::<Vec<_>>())
                .finish(),
            Self::Chain(kind) => f.debug_tuple("Chain").field(kind).finish(),
            Self::Echo => f.write_str("Echo"),
        }
    }
}

/// How a binding decides whether it applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// Every token must occur in the transcript
    Tokens(Vec<String>),
    /// Matches any transcript
    Always,
}

/// A named (match, action) pair
#[derive(Debug, Clone)]
pub struct Binding {
    name: String,
    matcher: Match,
    action: Action,
}

impl Binding {
    /// Create a token-set binding
    ///
    /// Tokens are lower-cased so they compare against normalized transcripts.
    ///
    /// # Errors
    ///
    /// Returns error if the token set is empty or contains an empty token
    pub fn tokens<I, S>(name: impl Into<String>, tokens: I, action: Action) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();

        if tokens.is_empty() {
            return Err(Error::Config(format!("command {name}: token set is empty")));
        }
        if tokens.iter().any(String::is_empty) {
            return Err(Error::Config(format!("command {name}: empty token")));
        }

        Ok(Self {
            name,
            matcher: Match::Tokens(tokens),
            action,
        })
    }

    /// The catch-all binding that echoes the transcript
    #[must_use]
    pub fn catch_all() -> Self {
        Self {
            name: CATCH_ALL.to_string(),
            matcher: Match::Always,
            action: Action::Echo,
        }
    }

    /// Check the binding against a normalized transcript
    #[must_use]
    pub fn is_match(&self, normalized: &str) -> bool {
        match &self.matcher {
            Match::Tokens(tokens) => matcher::matches(normalized, tokens),
            Match::Always => true,
        }
    }

    /// Binding name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match rule
    #[must_use]
    pub const fn matcher(&self) -> &Match {
        &self.matcher
    }

    /// Action to perform
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }
}

/// Ordered bindings, evaluated first-match-wins, ending in a catch-all
#[derive(Debug, Clone)]
pub struct CommandTable {
    bindings: Vec<Binding>,
    catch_all: Binding,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTable {
    /// Create a table holding only the catch-all
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            catch_all: Binding::catch_all(),
        }
    }

    /// Append a binding after all existing ones, still ahead of the catch-all
    ///
    /// # Errors
    ///
    /// Returns error if a binding with the same name already exists
    pub fn push(&mut self, binding: Binding) -> Result<()> {
        if binding.name == CATCH_ALL || self.bindings.iter().any(|b| b.name == binding.name) {
            return Err(Error::Config(format!(
                "duplicate command name: {}",
                binding.name
            )));
        }
        self.bindings.push(binding);
        Ok(())
    }

    /// Builder form of [`Self::push`]
    ///
    /// # Errors
    ///
    /// Returns error if a binding with the same name already exists
    pub fn with(mut self, binding: Binding) -> Result<Self> {
        self.push(binding)?;
        Ok(self)
    }

    /// Find the first binding matching a normalized transcript
    ///
    /// Never fails: the catch-all matches when nothing else does.
    #[must_use]
    pub fn find(&self, normalized: &str) -> &Binding {
        self.bindings
            .iter()
            .find(|b| b.is_match(normalized))
            .unwrap_or(&self.catch_all)
    }

    /// All bindings in evaluation order, catch-all last
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().chain(std::iter::once(&self.catch_all))
    }

    /// Chain kinds referenced by the table
    pub fn chain_kinds(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().filter_map(|b| match &b.action {
            Action::Chain(kind) => Some(kind.as_str()),
            _ => None,
        })
    }

    /// Number of bindings excluding the catch-all
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if the table has no bindings besides the catch-all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
