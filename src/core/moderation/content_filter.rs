// Content filter - profanity redaction and spam-shape detection.
//
// Everything here is a fixed-size matcher walked once over the message:
// word patterns are compared slot by slot at word starts, and the spam
// shapes are counted runs. There is no backtracking, so cost stays linear in
// the message length no matter what a sender types.

use super::moderation_config::ModerationConfig;
use super::moderation_models::{FilterResult, FilterWarning};

/// Plain words matched whole and case-insensitively.
const PROFANITY_VOCABULARY: &[&str] = &[
    "fuck", "shit", "bitch", "bastard", "asshole", "dick", "cunt", "crap", "damn", "piss", "slut",
    "whore",
];

/// Obscenities with common single-character substitutions.
///
/// Each entry is one slot per character; a slot lists every character that
/// may stand in that position.
const LEETSPEAK_PATTERNS: &[&[&str]] = &[
    &["f", "u*@v#", "c", "k"],
    &["s", "h", "i1!*|", "t"],
    &["b", "i1!*|", "t", "c", "h"],
    &["a@4", "s$5", "s$5", "h", "o0*", "l1", "e3"],
    &["d", "i1!*|", "c", "k"],
    &["c", "u*@v", "n", "t"],
    &["w", "h", "o0*", "r", "e3"],
];

/// A fixed-length word matcher made of per-position character sets.
#[derive(Debug, Clone)]
struct WordPattern {
    slots: Vec<Vec<char>>,
}

impl WordPattern {
    fn literal(word: &str) -> Self {
        Self {
            slots: word.chars().map(|c| vec![c.to_ascii_lowercase()]).collect(),
        }
    }

    fn with_substitutions(slots: &[&str]) -> Self {
        Self {
            slots: slots
                .iter()
                .map(|slot| slot.chars().map(|c| c.to_ascii_lowercase()).collect())
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Does the pattern match `chars` starting exactly at `start`?
    fn matches_at(&self, chars: &[char], start: usize) -> bool {
        if start + self.len() > chars.len() {
            return false;
        }
        self.slots
            .iter()
            .zip(&chars[start..start + self.len()])
            .all(|(slot, c)| slot.contains(&c.to_ascii_lowercase()))
    }
}

/// One profanity rule. A rule produces at most one warning per message.
#[derive(Debug, Clone)]
struct ProfanityRule {
    patterns: Vec<WordPattern>,
}

impl ProfanityRule {
    /// Replace every whole-word match with asterisks in place.
    /// Returns whether anything was redacted.
    fn redact(&self, chars: &mut [char]) -> bool {
        let mut matched = false;
        let mut i = 0;

        while i < chars.len() {
            if !is_word_start(chars, i) {
                i += 1;
                continue;
            }

            let hit = self
                .patterns
                .iter()
                .find(|p| p.matches_at(chars, i) && is_word_end(chars, i + p.len()))
                .map(WordPattern::len);

            match hit {
                Some(len) => {
                    chars[i..i + len].iter_mut().for_each(|c| *c = '*');
                    matched = true;
                    i += len;
                }
                None => i += 1,
            }
        }

        matched
    }
}

/// Unicode letters, digits and `_`.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_start(chars: &[char], i: usize) -> bool {
    i == 0 || !is_word_char(chars[i - 1])
}

fn is_word_end(chars: &[char], end: usize) -> bool {
    end >= chars.len() || !is_word_char(chars[end])
}

/// Length of the longest run of identical consecutive characters.
fn longest_repeat_run(chars: &[char]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<char> = None;

    for &c in chars {
        current = if previous == Some(c) { current + 1 } else { 1 };
        previous = Some(c);
        longest = longest.max(current);
    }

    longest
}

/// Length of the longest run of consecutive uppercase letters.
///
/// Uses the same Unicode character classes as the word-boundary check, so
/// `ÉCOLE` counts as a run of five.
fn longest_uppercase_run(chars: &[char]) -> usize {
    let mut longest = 0;
    let mut current = 0;

    for &c in chars {
        current = if c.is_uppercase() { current + 1 } else { 0 };
        longest = longest.max(current);
    }

    longest
}

/// Stateless message filter. Build once, share freely.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    rules: Vec<ProfanityRule>,
    max_length: usize,
    repeated_char_run: usize,
    uppercase_run: usize,
}

impl ContentFilter {
    /// Build a filter from `config`.
    ///
    /// Thresholds below 1 are raised to 1: a run or length limit of zero
    /// would flag empty content.
    pub fn new(config: &ModerationConfig) -> Self {
        // The plain vocabulary is a single rule; every leetspeak pattern is
        // a rule of its own.
        let mut rules = vec![ProfanityRule {
            patterns: PROFANITY_VOCABULARY
                .iter()
                .map(|word| WordPattern::literal(word))
                .collect(),
        }];
        rules.extend(LEETSPEAK_PATTERNS.iter().map(|slots| ProfanityRule {
            patterns: vec![WordPattern::with_substitutions(slots)],
        }));

        Self {
            rules,
            max_length: config.max_message_length.max(1),
            repeated_char_run: config.repeated_char_run.max(1),
            uppercase_run: config.uppercase_run.max(1),
        }
    }

    /// Run every rule over `content` and collect the outcome.
    ///
    /// Profanity rules run in order over the progressively redacted text, so a
    /// word already starred out by an earlier rule is not reported again.
    /// Spam-shape and length rules look at the original content.
    pub fn filter(&self, content: &str) -> FilterResult {
        let original: Vec<char> = content.chars().collect();
        let mut redacted = original.clone();
        let mut warnings = Vec::new();

        // 1. Profanity (redacts, never blocks)
        for rule in &self.rules {
            if rule.redact(&mut redacted) {
                warnings.push(FilterWarning::InappropriateLanguage);
            }
        }

        // 2. Spam shapes
        if longest_repeat_run(&original) >= self.repeated_char_run {
            warnings.push(FilterWarning::Spam);
        }
        if longest_uppercase_run(&original) >= self.uppercase_run {
            warnings.push(FilterWarning::Spam);
        }

        // 3. Length
        if original.len() > self.max_length {
            warnings.push(FilterWarning::TooLong {
                max: self.max_length,
            });
        }

        FilterResult {
            filtered: redacted.into_iter().collect(),
            blocked: warnings.iter().any(FilterWarning::is_blocking),
            warnings,
        }
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(&ModerationConfig::default())
    }
}
