use serde::{Deserialize, Serialize};

/// Native wire format of a source's canonical URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Syndication,
    Api,
    Listing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub kind: SourceKind,
}

impl Source {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            kind: SourceKind::Syndication,
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }

    /// The sources shipped with the default configuration.
    pub fn builtin() -> Vec<Source> {
        vec![
            Source::new("cnbeta", "CnBeta", "https://www.cnbeta.com.tw/backend.php?rid=1"),
            Source::new("36kr", "36Kr", "https://36kr.com/feed"),
            Source::new("sspai", "少数派", "https://sspai.com/feed"),
            Source::new("verge", "The Verge", "https://www.theverge.com/rss/index.xml"),
            Source::new("hackernews", "Hacker News", "https://news.ycombinator.com/rss"),
            Source::new("v2ex", "V2EX", "https://www.v2ex.com/index.xml"),
        ]
    }
}
