//! Question routing: local pattern answers first, external reasoning otherwise.
//!
//! Local matches are answered synchronously from the in-memory dataset without
//! touching the reasoning engine. Everything else is handed to a
//! [`ReasoningEngine`] and its reply is normalized into the same block protocol.

use crate::blocks::ResponseBlock;
use crate::config::{AppConfig, ReasoningConfig};
use crate::dataset::Dataset;
use crate::executor::PlanExecutor;
use crate::intent::{IntentMatcher, LocalIntent, MatchOutcome};
use crate::plan::{ExecutionPlan, PlanAction};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};

/// Compact description of the dataset handed to the reasoning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetProfile {
    pub headers: Vec<String>,
    pub row_count: usize,
    pub sample_rows: Vec<Vec<String>>,
}

impl DatasetProfile {
    pub fn from_dataset(dataset: &Dataset, sample_rows: usize) -> Self {
        let (headers, rows) = dataset.preview(&[], sample_rows);
        Self {
            headers,
            row_count: dataset.len(),
            sample_rows: rows,
        }
    }

    /// Text summary suitable for a prompt.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Rows: {}\n", self.row_count));
        s.push_str(&format!("Columns: {}\n", self.headers.join(", ")));
        if !self.sample_rows.is_empty() {
            s.push_str("\nSample rows:\n");
            for row in &self.sample_rows {
                s.push_str(&format!("- {}\n", row.join(" | ")));
            }
        }
        s
    }
}

/// Everything the external engine receives for an unmatched question.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningRequest<'a> {
    pub question: &'a str,
    pub profile: DatasetProfile,
    /// Free-text reference material, forwarded untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<&'a str>,
    #[serde(skip)]
    pub dataset: &'a Dataset,
    /// Provider, model, endpoint, credentials variable and timeout to use.
    #[serde(skip)]
    pub settings: &'a ReasoningConfig,
}

/// External reasoning collaborator. Implementations own the transport and take
/// endpoint, credentials and timeout from [`ReasoningRequest::settings`]; they
/// return the raw reply text.
pub trait ReasoningEngine {
    fn reason(&self, request: &ReasoningRequest<'_>) -> Result<String>;
}

/// Structured reply expected from the reasoning engine. All parts are optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineReply {
    /// Prose answer, rendered as markdown.
    pub answer: Option<String>,
    /// Plan to execute locally; its result blocks follow the answer text.
    pub plan: Option<ExecutionPlan>,
    /// Blocks produced directly by the engine.
    pub blocks: Vec<ResponseBlock>,
}

impl EngineReply {
    /// Parse raw reply text. A JSON object anywhere in the text (code fences and
    /// surrounding prose allowed) is decoded as a reply; anything else becomes a
    /// plain markdown answer. An object carrying none of `answer`, `plan` or
    /// `blocks` is not a reply, so the whole text is kept as prose.
    pub fn parse(raw: &str) -> Self {
        if let Some(json) = extract_json(raw) {
            match serde_json::from_str::<EngineReply>(json) {
                Ok(reply) if !reply.is_empty() => return reply,
                Ok(_) => tracing::debug!("braces in reasoning reply hold no reply fields"),
                Err(e) => tracing::warn!(error = %e, "reasoning reply is not a valid reply object"),
            }
        }
        EngineReply {
            answer: Some(raw.trim().to_string()),
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.answer.is_none() && self.plan.is_none() && self.blocks.is_empty()
    }
}

/// Slice from the first `{` to the last `}`, if any.
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSource {
    /// Answered by a local recognizer.
    Local(LocalIntent),
    /// Answered by the reasoning engine.
    External,
    /// No local match and no engine configured.
    Unanswered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub source: AnswerSource,
    pub blocks: Vec<ResponseBlock>,
}

pub struct Orchestrator {
    matcher: IntentMatcher,
    executor: PlanExecutor,
    engine: Option<Box<dyn ReasoningEngine>>,
    settings: ReasoningConfig,
    preview_rows: usize,
}

impl Orchestrator {
    pub fn new(matcher: IntentMatcher, executor: PlanExecutor) -> Self {
        Self {
            matcher,
            executor,
            engine: None,
            settings: ReasoningConfig::default(),
            preview_rows: 20,
        }
    }

    /// Orchestrator wired from configuration: chart style, metric columns,
    /// preview size and reasoning settings.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let matcher = IntentMatcher::new(config.chart.style())?;
        let executor = PlanExecutor::new(config.metrics.columns());
        let mut orchestrator = Self::new(matcher, executor);
        orchestrator.settings = config.reasoning.clone();
        orchestrator.preview_rows = config.answer.preview_rows;
        Ok(orchestrator)
    }

    pub fn with_engine(mut self, engine: Box<dyn ReasoningEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Answer `question` about `dataset`. Errors only come from the reasoning engine.
    pub fn ask(&self, question: &str, dataset: &Dataset, reference: Option<&str>) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(eyre!("Question is empty"));
        }

        if let MatchOutcome::Answered { intent, blocks } =
            self.matcher.match_question(question, dataset)
        {
            return Ok(Answer {
                source: AnswerSource::Local(intent),
                blocks,
            });
        }

        let Some(engine) = &self.engine else {
            return Ok(Answer {
                source: AnswerSource::Unanswered,
                blocks: vec![ResponseBlock::markdown(format!(
                    "No built-in pattern matches \"{}\" and no reasoning engine is configured \
                     (provider = \"{}\"). Try \"distribution of <column>\", \
                     \"unique count of <column>\" or \"percentage of <column> containing <column>\".",
                    question, self.settings.provider
                ))],
            });
        };

        let request = ReasoningRequest {
            question,
            profile: DatasetProfile::from_dataset(dataset, self.settings.sample_rows),
            reference,
            dataset,
            settings: &self.settings,
        };
        tracing::debug!(
            provider = %self.settings.provider,
            model = %self.settings.model,
            timeout_secs = self.settings.timeout_secs,
            "deferring to reasoning engine"
        );
        let raw = engine.reason(&request)?;
        let reply = EngineReply::parse(&raw);
        Ok(Answer {
            source: AnswerSource::External,
            blocks: self.reply_blocks(reply, dataset),
        })
    }

    /// Execute a plan directly and present its result.
    pub fn run_plan(&self, plan: &ExecutionPlan, dataset: &Dataset) -> Vec<ResponseBlock> {
        if plan.action == PlanAction::DirectAnalysis {
            return vec![ResponseBlock::markdown(format!(
                "Direct analysis over all {} rows; nothing to compute locally.",
                dataset.len()
            ))];
        }
        self.executor
            .execute(plan, dataset)
            .to_blocks(plan, self.preview_rows)
    }

    fn reply_blocks(&self, reply: EngineReply, dataset: &Dataset) -> Vec<ResponseBlock> {
        let mut blocks = Vec::new();
        if let Some(answer) = reply.answer.filter(|a| !a.trim().is_empty()) {
            blocks.push(ResponseBlock::markdown(answer));
        }
        if let Some(plan) = reply.plan {
            if plan.action == PlanAction::FilterAndAnalyze {
                blocks.extend(
                    self.executor
                        .execute(&plan, dataset)
                        .to_blocks(&plan, self.preview_rows),
                );
            }
        }
        blocks.extend(reply.blocks);
        if blocks.is_empty() {
            blocks.push(ResponseBlock::markdown(
                "The reasoning engine returned an empty answer.",
            ));
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_with_fences() {
        let raw = "Here you go:\n```json\n{\"answer\": \"Most returns are UPS.\", \"blocks\": [{\"type\": \"markdown\", \"text\": \"extra\"}]}\n```";
        let reply = EngineReply::parse(raw);
        assert_eq!(reply.answer.as_deref(), Some("Most returns are UPS."));
        assert_eq!(reply.blocks, vec![ResponseBlock::markdown("extra")]);
        assert!(reply.plan.is_none());
    }

    #[test]
    fn test_parse_plain_text_reply() {
        let reply = EngineReply::parse("  Returns went up in March.  ");
        assert_eq!(reply.answer.as_deref(), Some("Returns went up in March."));
        assert!(reply.blocks.is_empty());
    }

    #[test]
    fn test_parse_invalid_json_falls_back_to_text() {
        let reply = EngineReply::parse("{not json}");
        assert_eq!(reply.answer.as_deref(), Some("{not json}"));
    }

    #[test]
    fn test_parse_prose_with_braces_keeps_whole_text() {
        let raw = "Group rows by carrier using {} as the key, then compare counts.";
        let reply = EngineReply::parse(raw);
        assert_eq!(reply.answer.as_deref(), Some(raw));
        assert!(reply.plan.is_none());
        assert!(reply.blocks.is_empty());

        let raw = "Use a map like {\"UPS\": 3} to tally carriers.";
        assert_eq!(EngineReply::parse(raw).answer.as_deref(), Some(raw));
    }

    #[test]
    fn test_profile_summary() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into(), "4".into()]],
        );
        let profile = DatasetProfile::from_dataset(&ds, 1);
        assert_eq!(profile.row_count, 2);
        assert_eq!(profile.sample_rows.len(), 1);
        let summary = profile.summary();
        assert!(summary.contains("Columns: a, b"));
        assert!(summary.contains("- 1 | 2"));
    }
}
