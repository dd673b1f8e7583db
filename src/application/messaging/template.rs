//! Response templates - Literal text interspersed with module mentions

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::fmt;

/// Delimiter wrapped around module mentions, e.g. `%caller%`
pub const MENTION_DELIMITER: char = '%';

/// Delimiter used by older channel configs, e.g. `&caller&`
pub const LEGACY_MENTION_DELIMITER: char = '&';

/// A module returning this anywhere in its output vetoes the whole reply
pub const NO_MESSAGE_SIGNAL: &str = "{{NO_MESSAGE}}";

/// One piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Literal(String),
    Mention(String),
}

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").unwrap());

/// Whether `name` is a valid command or module identifier
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// A tokenized response template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    delimiter: char,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse with the default `%` delimiter
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, MENTION_DELIMITER)
    }

    /// Parse `text` into a flat list of literals and mentions.
    ///
    /// A delimiter pair only forms a mention when it encloses an identifier.
    /// Anything else, including an unmatched delimiter, stays literal.
    pub fn parse_with(text: &str, delimiter: char) -> Self {
        let mut nodes = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(open) = rest.find(delimiter) {
            let after = &rest[open + delimiter.len_utf8()..];
            match after.find(delimiter) {
                Some(close) if is_identifier(&after[..close]) => {
                    literal.push_str(&rest[..open]);
                    if !literal.is_empty() {
                        nodes.push(Node::Literal(std::mem::take(&mut literal)));
                    }
                    nodes.push(Node::Mention(after[..close].to_string()));
                    rest = &after[close + delimiter.len_utf8()..];
                }
                Some(_) => {
                    // The closing delimiter may open the next mention
                    literal.push_str(&rest[..open + delimiter.len_utf8()]);
                    rest = after;
                }
                None => break,
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            nodes.push(Node::Literal(literal));
        }

        Self { delimiter, nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Mentioned module names, first occurrence order, without duplicates
    pub fn mentions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if let Node::Mention(name) = node {
                if !seen.contains(&name.as_str()) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    /// Evaluate node by node, left to right.
    ///
    /// `resolve` is called once per mention, in order. Its output is pasted
    /// in as-is and never scanned again.
    pub fn render<E, F>(&self, mut resolve: F) -> Result<String, E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Literal(text) => out.push_str(text),
                Node::Mention(name) => out.push_str(&resolve(name)?),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            match node {
                Node::Literal(text) => f.write_str(text)?,
                Node::Mention(name) => write!(f, "{d}{name}{d}", d = self.delimiter)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Node {
        Node::Literal(s.to_string())
    }

    fn mention(s: &str) -> Node {
        Node::Mention(s.to_string())
    }

    #[test]
    fn test_parse_mentions_and_literals() {
        let template = Template::parse("@%caller% > %help%");
        assert_eq!(
            template.nodes(),
            &[lit("@"), mention("caller"), lit(" > "), mention("help")]
        );
        assert_eq!(template.mentions(), vec!["caller", "help"]);
    }

    #[test]
    fn test_non_identifier_between_delimiters_is_literal() {
        let template = Template::parse("100% sure, 50%off %caller%");
        assert_eq!(
            template.nodes(),
            &[lit("100% sure, 50%off "), mention("caller")]
        );
    }

    #[test]
    fn test_unmatched_and_empty_delimiters_are_literal() {
        assert_eq!(Template::parse("50%").nodes(), &[lit("50%")]);
        assert_eq!(Template::parse("%%").nodes(), &[lit("%%")]);
        assert_eq!(Template::parse("%Caller%").nodes(), &[lit("%Caller%")]);
        assert!(Template::parse("").nodes().is_empty());
    }

    #[test]
    fn test_legacy_delimiter() {
        let template = Template::parse_with("&caller& > &help&", LEGACY_MENTION_DELIMITER);
        assert_eq!(template.mentions(), vec!["caller", "help"]);
        assert_eq!(template.to_string(), "&caller& > &help&");

        // The other delimiter is just text
        assert!(Template::parse("&caller&").mentions().is_empty());
    }

    #[test]
    fn test_duplicate_mentions_are_listed_once_but_rendered_twice() {
        let template = Template::parse("%a%-%a%");
        assert_eq!(template.mentions(), vec!["a"]);

        let mut calls = 0;
        let out: Result<String, ()> = template.render(|_| {
            calls += 1;
            Ok(calls.to_string())
        });
        assert_eq!(out.unwrap(), "1-2");
    }

    #[test]
    fn test_module_output_is_not_rescanned() {
        let template = Template::parse("say %echo%!");
        let out: Result<String, ()> = template.render(|_| Ok("%caller%".to_string()));
        assert_eq!(out.unwrap(), "say %caller%!");
    }

    #[test]
    fn test_render_stops_at_first_error() {
        let template = Template::parse("%ok% %missing% %never%");
        let mut seen = Vec::new();
        let out = template.render(|name| {
            seen.push(name.to_string());
            if name == "missing" {
                Err(format!("module {} is not loaded", name))
            } else {
                Ok(name.to_uppercase())
            }
        });

        assert_eq!(out.unwrap_err(), "module missing is not loaded");
        assert_eq!(seen, vec!["ok", "missing"]);
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("help"));
        assert!(is_identifier("debug_2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("Help"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier("a-b"));
    }
}
