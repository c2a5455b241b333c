//! Intent matching: an ordered dispatch table of text recognizers that route a
//! free-text question to a local handler.
//!
//! Recognizers are tried in order and the first structural match wins, so
//! compound patterns ("percentage of A containing B") sit before the general
//! single-column ones ("distribution of X"). A question no recognizer accepts
//! yields [`MatchOutcome::NoMatch`], which callers route to external reasoning.

use crate::blocks::{ChartStyle, ResponseBlock};
use crate::dataset::Dataset;
use crate::handlers::HandlerKind;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use regex::{Regex, RegexBuilder};

/// Quote characters stripped from both ends of captured arguments.
const QUOTE_CHARS: &[char] = &[
    '"', '\'', '`', '“', '”', '‘', '’', '「', '」', '『', '』', '《', '》',
];

/// Built-in recognizers, most specific first. Every pattern is compiled case-insensitively.
const DEFAULT_RECOGNIZERS: &[(&str, &str, HandlerKind)] = &[
    (
        "containment_percentage_en",
        r"^\s*(?:what\s+(?:is|'s)\s+the\s+)?(?:percentage|percent|proportion|share|ratio)\s+of\s+(?:the\s+)?(.+?)\s+(?:that\s+)?(?:contains?|containing)\s+(?:the\s+)?(.+?)\s*[?？.]?\s*$",
        HandlerKind::ContainmentPercentage,
    ),
    (
        "containment_percentage_zh",
        r"^\s*(.+?)\s*包含\s*(.+?)\s*的\s*(?:百分比|比例|占比)\s*(?:是多少)?\s*[?？]?\s*$",
        HandlerKind::ContainmentPercentage,
    ),
    (
        "unique_count_en",
        r"^\s*(?:what(?:\s+is|'s|’s)\s+the\s+)?(?:unique|distinct)\s+count\s+(?:of|for|in)\s+(?:the\s+)?(.+?)(?:\s+column)?\s*[?？.]?\s*$",
        HandlerKind::UniqueCount,
    ),
    (
        "unique_count_how_many_en",
        r"^\s*how\s+many\s+(?:unique|distinct)\s+(?:values\s+(?:of|in|for)\s+)?(?:the\s+)?(.+?)(?:\s+values)?(?:\s+are\s+there)?\s*[?？.]?\s*$",
        HandlerKind::UniqueCount,
    ),
    (
        "unique_count_number_of_en",
        r"^\s*(?:the\s+)?(?:number|count)\s+of\s+(?:unique|distinct)\s+(?:values\s+(?:of|in|for)\s+)?(?:the\s+)?(.+?)\s*[?？.]?\s*$",
        HandlerKind::UniqueCount,
    ),
    (
        "unique_count_zh",
        r"^\s*(.+?)\s*的?\s*(?:唯一值|不同值|去重值?)\s*的?\s*(?:数量|个数|数目|计数)\s*(?:是多少)?\s*[?？]?\s*$",
        HandlerKind::UniqueCount,
    ),
    (
        "unique_count_how_many_zh",
        r"^\s*(.+?)\s*有多少(?:个|种)?(?:不同|唯一)的?值?\s*[?？]?\s*$",
        HandlerKind::UniqueCount,
    ),
    (
        "distribution_en",
        r"^\s*(?:show\s+(?:me\s+)?|what(?:\s+is|'s|’s)\s+)?(?:the\s+)?(?:distribution|breakdown|value\s+counts)\s+(?:of|for|by)\s+(?:the\s+)?(.+?)(?:\s+column)?\s*[?？.]?\s*$",
        HandlerKind::Distribution,
    ),
    (
        "distribution_zh",
        r"^\s*(.+?)\s*的?\s*分布(?:情况)?\s*(?:是什么|如何|怎么样)?\s*[?？]?\s*$",
        HandlerKind::Distribution,
    ),
];

/// One entry of the dispatch table: a pattern, the handler it routes to, and
/// the number of arguments it captures (the handler's arity).
#[derive(Debug, Clone)]
pub struct Recognizer {
    name: String,
    pattern: Regex,
    handler: HandlerKind,
}

impl Recognizer {
    /// Compile `pattern` case-insensitively. The pattern must capture exactly as
    /// many groups as `handler` takes arguments.
    pub fn new(name: impl Into<String>, pattern: &str, handler: HandlerKind) -> Result<Self> {
        let name = name.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| eyre!("Invalid pattern for recognizer '{}': {}", name, e))?;
        let captures = pattern.captures_len() - 1;
        if captures != handler.arity() {
            return Err(eyre!(
                "Recognizer '{}' captures {} argument(s) but {} expects {}",
                name,
                captures,
                handler.name(),
                handler.arity()
            ));
        }
        Ok(Self {
            name,
            pattern,
            handler,
        })
    }

    /// Cleaned arguments if the question matches and every capture is non-empty.
    fn extract(&self, question: &str) -> Option<Vec<String>> {
        let caps = self.pattern.captures(question)?;
        let args: Vec<String> = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| clean_argument(m.as_str())).unwrap_or_default())
            .collect();
        if args.len() == self.handler.arity() && args.iter().all(|a| !a.is_empty()) {
            Some(args)
        } else {
            None
        }
    }
}

/// Trim whitespace and surrounding quote characters.
pub fn clean_argument(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c.is_whitespace() || QUOTE_CHARS.contains(&c))
        .to_string()
}

/// A question resolved to a local handler and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIntent {
    pub recognizer: String,
    pub handler: HandlerKind,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A recognizer matched; the blocks are the handler's answer (possibly a
    /// missing-column message).
    Answered {
        intent: LocalIntent,
        blocks: Vec<ResponseBlock>,
    },
    /// No recognizer matched; defer to external reasoning.
    NoMatch,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Answered { .. })
    }

    pub fn into_blocks(self) -> Option<Vec<ResponseBlock>> {
        match self {
            MatchOutcome::Answered { blocks, .. } => Some(blocks),
            MatchOutcome::NoMatch => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntentMatcher {
    recognizers: Vec<Recognizer>,
    style: ChartStyle,
}

impl IntentMatcher {
    /// Matcher with the built-in English and Chinese recognizers.
    pub fn new(style: ChartStyle) -> Result<Self> {
        let recognizers = DEFAULT_RECOGNIZERS
            .iter()
            .map(|(name, pattern, handler)| Recognizer::new(*name, pattern, *handler))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_recognizers(recognizers, style))
    }

    pub fn with_recognizers(recognizers: Vec<Recognizer>, style: ChartStyle) -> Self {
        Self { recognizers, style }
    }

    pub fn recognizers(&self) -> &[Recognizer] {
        &self.recognizers
    }

    /// Insert a recognizer at `position` in the evaluation order (clamped to the end).
    pub fn insert(&mut self, position: usize, recognizer: Recognizer) {
        let position = position.min(self.recognizers.len());
        self.recognizers.insert(position, recognizer);
    }

    /// First recognizer that accepts `question`, without touching any data.
    pub fn recognize(&self, question: &str) -> Option<LocalIntent> {
        self.recognizers.iter().find_map(|r| {
            r.extract(question).map(|args| LocalIntent {
                recognizer: r.name.clone(),
                handler: r.handler,
                args,
            })
        })
    }

    /// Recognize `question` and, on a match, run its handler over `dataset`.
    pub fn match_question(&self, question: &str, dataset: &Dataset) -> MatchOutcome {
        match self.recognize(question) {
            Some(intent) => {
                tracing::debug!(
                    recognizer = %intent.recognizer,
                    handler = intent.handler.name(),
                    args = ?intent.args,
                    "local match"
                );
                let blocks = intent.handler.run(dataset, &intent.args, &self.style);
                MatchOutcome::Answered { intent, blocks }
            }
            None => {
                tracing::debug!(question, "no local match");
                MatchOutcome::NoMatch
            }
        }
    }
}
