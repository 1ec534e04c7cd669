use crate::error::ConfigError;
use std::fmt;

/// What a decoded payload means to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Open,
    Close,
    Test,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Open,
        Category::Close,
        Category::Test,
        Category::Unknown,
    ];
    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Open => "OPEN",
            Category::Close => "CLOSE",
            Category::Test => "TEST",
            Category::Unknown => "UNKNOWN",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Category::Open => 0,
            Category::Close => 1,
            Category::Test => 2,
            Category::Unknown => 3,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Category::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secrets for the recognized categories, fixed at startup.
#[derive(Clone)]
pub struct TokenSet {
    entries: Vec<(Category, String)>,
}

impl TokenSet {
    pub fn new(
        open: Option<String>,
        close: Option<String>,
        test: Option<String>,
    ) -> Result<Self, ConfigError> {
        let open = open
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken("OPEN"))?;
        let close = close
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken("CLOSE"))?;

        let mut entries = vec![(Category::Open, open), (Category::Close, close)];
        if let Some(test) = test.filter(|token| !token.is_empty()) {
            entries.push((Category::Test, test));
        }

        for (i, (first, token)) in entries.iter().enumerate() {
            if let Some((second, _)) = entries[i + 1..].iter().find(|(_, other)| other == token) {
                return Err(ConfigError::DuplicateToken(first.as_str(), second.as_str()));
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.entries.iter().any(|(c, _)| *c == category)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.iter().map(|(category, _)| *category)
    }

    pub fn token(&self, category: Category) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, token)| token.as_str())
    }
}

// Secrets never reach the logs through Debug.
impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(category, token)| {
                format!("{}={}", category, preview(token, 4))
            }))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    tokens: TokenSet,
}

impl Classifier {
    pub fn new(tokens: TokenSet) -> Self {
        Self { tokens }
    }

    /// Exact match against the configured secrets.
    pub fn classify(&self, text: &str) -> Category {
        self.tokens
            .entries
            .iter()
            .find(|(_, token)| token == text)
            .map(|(category, _)| *category)
            .unwrap_or(Category::Unknown)
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }
}

/// First `max_chars` characters of `text`, with `...` appended when truncated.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
