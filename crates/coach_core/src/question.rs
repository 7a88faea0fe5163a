use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// The four labeled sections of a generated question, in the order they must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Question,
    Options,
    CorrectAnswer,
    Explanation,
}

impl Section {
    const ORDER: [Section; 4] = [
        Section::Question,
        Section::Options,
        Section::CorrectAnswer,
        Section::Explanation,
    ];

    fn header(self) -> &'static Regex {
        match self {
            Section::Question => &QUESTION_HEADER,
            Section::Options => &OPTIONS_HEADER,
            Section::CorrectAnswer => &CORRECT_ANSWER_HEADER,
            Section::Explanation => &EXPLANATION_HEADER,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Question => write!(f, "Question"),
            Section::Options => write!(f, "Options"),
            Section::CorrectAnswer => write!(f, "Correct Answer"),
            Section::Explanation => write!(f, "Explanation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing or empty section: {0}")]
    MissingSection(Section),
    #[error("correct answer `{label}` does not match any option")]
    CorrectAnswerNotFound { label: char },
    #[error("option `{0}` appears more than once")]
    DuplicateOption(OptionLabel),
}

static QUESTION_HEADER: LazyLock<Regex> = LazyLock::new(|| header_regex(r"question"));
static OPTIONS_HEADER: LazyLock<Regex> = LazyLock::new(|| header_regex(r"options"));
static CORRECT_ANSWER_HEADER: LazyLock<Regex> =
    LazyLock::new(|| header_regex(r"correct\s+answer"));
static EXPLANATION_HEADER: LazyLock<Regex> = LazyLock::new(|| header_regex(r"explanation"));

/// `a)` .. `d)` at the start of the section or after whitespace.
static OPTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)([a-d])\)").unwrap());

fn header_regex(name: &str) -> Regex {
    // Patterns are static literals; compilation cannot fail.
    Regex::new(&format!(r"(?i)\b{name}\s*:")).unwrap()
}

/// Option label, always stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OptionLabel(char);

impl OptionLabel {
    /// Accepts `a`-`d` in either case.
    pub fn new(c: char) -> Option<Self> {
        let lower = c.to_ascii_lowercase();
        matches!(lower, 'a'..='d').then_some(Self(lower))
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOption {
    pub label: OptionLabel,
    pub text: String,
}

/// A validated multiple-choice question.
///
/// Only [`parse_question`] builds one, so the correct answer is always one of
/// the options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuestion {
    question: String,
    options: Vec<AnswerOption>,
    correct_index: usize,
    explanation: String,
}

impl ParsedQuestion {
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Options in display order.
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    pub fn correct_answer(&self) -> &AnswerOption {
        &self.options[self.correct_index]
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// True when `label` (any case) names the correct option.
    pub fn is_correct(&self, label: char) -> bool {
        OptionLabel::new(label) == Some(self.correct_answer().label)
    }
}

/// Parse `Question: .. Options: .. Correct Answer: .. Explanation: ..` text.
pub fn parse_question(raw: &str) -> Result<ParsedQuestion, ParseError> {
    let [question, options, answer, explanation] = split_sections(raw)?;

    let options = parse_options(options)?;

    let target = answer
        .chars()
        .find(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .ok_or(ParseError::MissingSection(Section::CorrectAnswer))?;
    let correct_index = options
        .iter()
        .position(|option| option.label.as_char() == target)
        .ok_or(ParseError::CorrectAnswerNotFound { label: target })?;

    Ok(ParsedQuestion {
        question: question.to_string(),
        options,
        correct_index,
        explanation: explanation.to_string(),
    })
}

/// Locate the four headers in order and return each trimmed, non-empty body.
fn split_sections(raw: &str) -> Result<[&str; 4], ParseError> {
    let mut spans = [(0usize, 0usize); 4];
    let mut cursor = 0;
    for (slot, section) in spans.iter_mut().zip(Section::ORDER) {
        let found = section
            .header()
            .find_at(raw, cursor)
            .ok_or(ParseError::MissingSection(section))?;
        *slot = (found.start(), found.end());
        cursor = found.end();
    }

    let mut bodies = [""; 4];
    for (index, section) in Section::ORDER.into_iter().enumerate() {
        let body_start = spans[index].1;
        let body_end = spans.get(index + 1).map_or(raw.len(), |next| next.0);
        let body = raw[body_start..body_end].trim();
        if body.is_empty() {
            return Err(ParseError::MissingSection(section));
        }
        bodies[index] = body;
    }
    Ok(bodies)
}

fn parse_options(section: &str) -> Result<Vec<AnswerOption>, ParseError> {
    let tokens: Vec<(OptionLabel, usize, usize)> = OPTION_TOKEN
        .captures_iter(section)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?.as_str().chars().next().and_then(OptionLabel::new)?;
            Some((label, whole.start(), whole.end()))
        })
        .collect();

    let mut options: Vec<AnswerOption> = Vec::with_capacity(tokens.len());
    for (index, &(label, _, text_start)) in tokens.iter().enumerate() {
        if options.iter().any(|existing| existing.label == label) {
            return Err(ParseError::DuplicateOption(label));
        }
        let text_end = tokens.get(index + 1).map_or(section.len(), |next| next.1);
        options.push(AnswerOption {
            label,
            text: section[text_start..text_end].trim().to_string(),
        });
    }
    Ok(options)
}
