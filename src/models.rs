//! Request values for the Kennwort API.

use serde::Serialize;

/// The addressee of an outgoing email.
///
/// Either a bare address or an address paired with a display name. The
/// named form holds a list of pairs so that callers can pass whatever
/// ordered mapping they have; only the first pair is ever sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A bare email address.
    Address(String),
    /// `(email, display name)` pairs; only the first one is used.
    NamedAddress(Vec<(String, String)>),
}

impl Recipient {
    /// Create a recipient with a display name.
    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NamedAddress(vec![(email.into(), name.into())])
    }

    /// Form fields sent for this recipient.
    ///
    /// - `Address(e)` becomes `userEmail=e`.
    /// - `NamedAddress` becomes `userEmail`/`userName` from its first pair.
    ///   Later pairs are dropped without notice.
    /// - An empty `NamedAddress` yields no fields at all; the API then
    ///   reports the missing recipient itself.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Address(email) => vec![("userEmail", email.as_str())],
            Self::NamedAddress(pairs) => match pairs.first() {
                Some((email, name)) => {
                    vec![("userEmail", email.as_str()), ("userName", name.as_str())]
                }
                None => Vec::new(),
            },
        }
    }
}

impl From<&str> for Recipient {
    fn from(email: &str) -> Self {
        Self::Address(email.to_string())
    }
}

impl From<String> for Recipient {
    fn from(email: String) -> Self {
        Self::Address(email)
    }
}

impl<E: Into<String>, N: Into<String>> From<(E, N)> for Recipient {
    fn from((email, name): (E, N)) -> Self {
        Self::named(email, name)
    }
}

impl<E: Into<String>, N: Into<String>> From<Vec<(E, N)>> for Recipient {
    fn from(pairs: Vec<(E, N)>) -> Self {
        Self::NamedAddress(
            pairs
                .into_iter()
                .map(|(email, name)| (email.into(), name.into()))
                .collect(),
        )
    }
}

impl<E: Into<String>, N: Into<String>, const LEN: usize> From<[(E, N); LEN]> for Recipient {
    fn from(pairs: [(E, N); LEN]) -> Self {
        Self::from(Vec::from(pairs))
    }
}

/// Pagination for listing endpoints.
///
/// Serialized as the `page` and `per-page` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based page number.
    pub page: u32,
    /// Items per page.
    #[serde(rename = "per-page")]
    pub per_page: u32,
}

impl Page {
    /// First page with the service's default page size.
    pub const DEFAULT: Page = Page {
        page: 1,
        per_page: 50,
    };

    /// Page `page` with `per_page` items.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::DEFAULT
    }
}
