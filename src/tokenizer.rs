use std::{fmt, net::IpAddr};

use crate::client::ClientRecord;

/// The attribute family a token was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Host,
    Label,
    Ip,
    User,
    Mac,
    Id,
}

/// Static per-category behaviour.
#[derive(Debug, Clone, Copy)]
pub struct CategoryInfo {
    /// Prefix accepted in queries (`host` for `host:Host-1`), if any.
    pub query_prefix: Option<&'static str>,
    /// Reachable by a query term without a prefix.
    pub default_eligible: bool,
    pub case_sensitive: bool,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Host,
        Category::Label,
        Category::Ip,
        Category::User,
        Category::Mac,
        Category::Id,
    ];

    pub const fn info(self) -> CategoryInfo {
        match self {
            Category::Host => CategoryInfo {
                query_prefix: Some("host"),
                default_eligible: false,
                case_sensitive: false,
            },
            Category::Label => CategoryInfo {
                query_prefix: Some("label"),
                default_eligible: false,
                case_sensitive: true,
            },
            Category::Ip => CategoryInfo {
                query_prefix: Some("ip"),
                default_eligible: false,
                case_sensitive: false,
            },
            Category::User => CategoryInfo {
                query_prefix: Some("user"),
                default_eligible: false,
                case_sensitive: false,
            },
            Category::Mac => CategoryInfo {
                query_prefix: None,
                default_eligible: true,
                case_sensitive: false,
            },
            Category::Id => CategoryInfo {
                query_prefix: None,
                default_eligible: true,
                case_sensitive: false,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Host => "host",
            Category::Label => "label",
            Category::Ip => "ip",
            Category::User => "user",
            Category::Mac => "mac",
            Category::Id => "id",
        }
    }

    /// Look up a category by its query prefix, ignoring case.
    pub fn from_query_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| {
            c.info()
                .query_prefix
                .is_some_and(|p| p.eq_ignore_ascii_case(prefix))
        })
    }

    /// Categories an unprefixed query term is matched against.
    pub fn default_scope() -> impl Iterator<Item = Category> {
        Self::ALL.into_iter().filter(|c| c.info().default_eligible)
    }

    /// Bring a raw attribute or query literal into the form stored in the
    /// index. Returns `None` for blank input.
    pub fn normalize(self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let value = match self {
            Category::Label => trimmed.to_string(),
            Category::Ip => match trimmed.parse::<IpAddr>() {
                Ok(addr) => addr.to_string(),
                Err(_) => trimmed.to_lowercase(),
            },
            Category::Mac => trimmed
                .chars()
                .filter(|c| !matches!(c, ':' | '-' | '.'))
                .collect::<String>()
                .to_lowercase(),
            Category::Host | Category::User | Category::Id => {
                trimmed.to_lowercase()
            }
        };

        (!value.is_empty()).then_some(value)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A normalized index key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token {
    pub category: Category,
    pub value: String,
}

impl Token {
    pub fn new(category: Category, raw: &str) -> Option<Self> {
        category.normalize(raw).map(|value| Self { category, value })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.value)
    }
}

/// Extract the keyword tokens of one client record.
///
/// Hostname and FQDN both land in the `host` category as separate tokens.
/// The result is sorted and free of duplicates.
pub fn tokenize(record: &ClientRecord) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut push = |category: Category, raw: &str| {
        if let Some(token) = Token::new(category, raw) {
            tokens.push(token);
        }
    };

    push(Category::Id, &record.client_id);
    push(Category::Host, &record.hostname);
    push(Category::Host, &record.fqdn);
    for label in &record.labels {
        push(Category::Label, &label.name);
    }
    for ip in &record.ip_addresses {
        push(Category::Ip, ip);
    }
    for mac in &record.mac_addresses {
        push(Category::Mac, mac);
    }
    for user in &record.users {
        push(Category::User, user);
    }

    tokens.sort();
    tokens.dedup();
    tokens
}
