use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Data collected for one crawled page
///
/// Serializes with the four link lists flattened into `links`, `mailto`,
/// `tel` and `hash` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Value of the crawled counter when the record was built
    pub id: u64,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status; absent when the request never got a response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(flatten)]
    pub links: PageLinks,

    pub error: PageError,
}

impl PageRecord {
    /// Record for a page whose request failed without a usable response
    pub fn failed(id: u64, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            title: None,
            status: None,
            links: PageLinks::default(),
            error: PageError::Message(message.into()),
        }
    }
}

/// Links found on a page, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    /// Absolute http(s) links
    #[serde(rename = "links", default)]
    pub url: Vec<String>,

    #[serde(default)]
    pub mailto: Vec<String>,

    #[serde(default)]
    pub tel: Vec<String>,

    /// In-page `#anchor` links
    #[serde(default)]
    pub hash: Vec<String>,
}

/// Error state of a page: `false`, an HTTP status code, or a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageError {
    #[default]
    None,
    Status(u16),
    Message(String),
}

impl PageError {
    /// Classifies a response status code
    pub fn from_status(status: u16) -> Self {
        if status >= 400 {
            Self::Status(status)
        } else {
            Self::None
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl Serialize for PageError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_bool(false),
            Self::Status(code) => serializer.serialize_u16(*code),
            Self::Message(msg) => serializer.serialize_str(msg),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageErrorRepr {
    Flag(bool),
    Status(u16),
    Message(String),
}

impl<'de> Deserialize<'de> for PageError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match PageErrorRepr::deserialize(deserializer)? {
            PageErrorRepr::Flag(false) => Self::None,
            PageErrorRepr::Flag(true) => Self::Message("error".to_string()),
            PageErrorRepr::Status(code) => Self::Status(code),
            PageErrorRepr::Message(msg) => Self::Message(msg),
        })
    }
}
