//! Forward scanning over the start tags of an HTML page
//!
//! The service's pages are not well-formed (forms are left open, inputs sit
//! outside their form), so every scrape goes through [`TagScanner`]: the
//! page is run through html5ever's tokenizer, without a tree builder, and
//! its start tags are handed out in source order as owned [`StartTag`]s.
//! No tag is moved or dropped the way DOM construction would. Owned tags
//! keep the scan results `Send`, so callers may hold them across `.await`
//! points.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

/// One start tag with its attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
}

impl StartTag {
    /// Tag name (lower-case)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ASCII case-insensitive tag name comparison
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Value of the first attribute named `key` (ASCII case-insensitive)
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// All attributes as `(name, value)` pairs
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn from_token(tag: &Tag) -> Self {
        Self {
            name: tag.name.to_string(),
            attrs: tag
                .attrs
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect(),
        }
    }
}

/// Collects start tags; switches the tokenizer into text mode where a browser would
#[derive(Default)]
struct StartTagSink {
    tags: Vec<StartTag>,
}

impl StartTagSink {
    /// Elements whose content is text, not markup
    fn raw_kind(name: &str) -> Option<RawKind> {
        match name {
            "script" => Some(RawKind::ScriptData),
            "style" | "xmp" | "noembed" | "noframes" => Some(RawKind::Rawtext),
            "textarea" | "title" => Some(RawKind::Rcdata),
            _ => None,
        }
    }
}

impl TokenSink for StartTagSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let Token::TagToken(tag) = token else {
            return TokenSinkResult::Continue;
        };
        if tag.kind != TagKind::StartTag {
            return TokenSinkResult::Continue;
        }
        let raw = if tag.self_closing {
            None
        } else {
            Self::raw_kind(&tag.name)
        };
        self.tags.push(StartTag::from_token(&tag));
        match raw {
            Some(kind) => TokenSinkResult::RawData(kind),
            None => TokenSinkResult::Continue,
        }
    }
}

/// Start tags of a document, in source order
#[derive(Debug)]
pub struct TagScanner {
    tags: std::vec::IntoIter<StartTag>,
}

impl TagScanner {
    /// Tokenize `markup` and position the scanner before its first tag
    pub fn new(markup: &str) -> Self {
        let mut input = BufferQueue::default();
        input.push_back(StrTendril::from_slice(markup));

        let mut tokenizer = Tokenizer::new(StartTagSink::default(), TokenizerOpts::default());
        // The sink never asks for a script pause, so one feed drains the input
        let _ = tokenizer.feed(&mut input);
        tokenizer.end();

        Self {
            tags: tokenizer.sink.tags.into_iter(),
        }
    }

    /// Advance past the next tag named `name` and return it
    pub fn skip_to(&mut self, name: &str) -> Option<StartTag> {
        self.tags.by_ref().find(|tag| tag.is(name))
    }
}

impl Iterator for TagScanner {
    type Item = StartTag;

    fn next(&mut self) -> Option<Self::Item> {
        self.tags.next()
    }
}
