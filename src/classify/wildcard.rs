//! Shell-style wildcard patterns.
//!
//! `*` matches any run of characters, `?` one character, and `[...]` a
//! character class (`[!...]` negates). Matching is case-sensitive and covers
//! the whole string. An unterminated `[` is a literal bracket.

use regex::Regex;
use std::fmt;

#[derive(Clone)]
enum Matcher {
    Any,
    Exact(String),
    Regex(Regex),
}

/// A compiled wildcard pattern.
#[derive(Clone)]
pub struct Wildcard {
    pattern: String,
    matcher: Matcher,
}

impl Wildcard {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let matcher = if pattern == "*" {
            Matcher::Any
        } else if !pattern.contains(['*', '?', '[']) {
            Matcher::Exact(pattern.to_string())
        } else {
            Matcher::Regex(Regex::new(&translate(pattern))?)
        };
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Exact(s) => s == text,
            Matcher::Regex(re) => re.is_match(text),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Wildcard").field(&self.pattern).finish()
    }
}

impl PartialEq for Wildcard {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

/// Any-of list of patterns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternSet(Vec<Wildcard>);

impl PatternSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        patterns
            .iter()
            .map(|p| Wildcard::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(PatternSet)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.0.iter().any(|w| w.matches(text))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(Wildcard::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Characters that need a backslash inside a regex class.
fn push_class_char(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}

/// Translate a wildcard into an anchored regex.
pub fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("^(?s:");

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                // collapse runs
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                // a `]` right after the opening is part of the class
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str("\\[");
                    continue;
                }

                let mut body = &chars[i..j];
                out.push('[');
                if body.first() == Some(&'!') {
                    out.push('^');
                    body = &body[1..];
                }
                let mut k = 0;
                while k < body.len() {
                    if k + 2 < body.len() && body[k + 1] == '-' {
                        push_class_char(&mut out, body[k]);
                        out.push('-');
                        push_class_char(&mut out, body[k + 2]);
                        k += 3;
                    } else {
                        push_class_char(&mut out, body[k]);
                        k += 1;
                    }
                }
                out.push(']');
                i = j + 1;
            }
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    out.push_str(")$");
    out
}
