//! In-process enrichment with deterministic heuristics.
//!
//! Intent and urgency use keyword matching on word boundaries, sentiment uses
//! a small lexicon, the embedding is a feature-hashed bag of words, and the
//! summary is extractive. Same input, same labels.

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use ticket_core::limits::{EMBEDDING_DIM, MAX_SUMMARY_WORDS, MIN_SUMMARY_WORDS};
use ticket_core::{EnrichmentResult, Error, RawTicket, Result, Sentiment, Urgency};
use tracing::debug;

use super::{EnrichmentGateway, GatewayConfig};

const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "login_issue",
        &[
            "login", "log in", "sign in", "signin", "password", "credentials",
            "authentication", "auth", "access denied", "locked out", "2fa", "mfa",
        ],
    ),
    (
        "payment_issue",
        &[
            "payment", "charge", "charged", "refund", "billing", "invoice",
            "transaction", "credit card", "debit", "declined", "failed payment",
        ],
    ),
    (
        "bug_report",
        &[
            "bug", "error", "crash", "broken", "not working", "doesn't work",
            "issue", "problem", "glitch", "freeze", "hang", "exception",
        ],
    ),
    (
        "feature_request",
        &[
            "feature", "request", "enhancement", "add", "support for", "would love",
            "suggestion", "improve", "could you add", "wish",
        ],
    ),
    (
        "account_management",
        &[
            "account", "profile", "settings", "update", "change", "delete",
            "deactivate", "email address", "phone number", "password reset",
        ],
    ),
    (
        "performance_issue",
        &[
            "slow", "performance", "loading", "timeout", "lag", "delay",
            "hanging", "speed", "takes too long",
        ],
    ),
    (
        "security_concern",
        &[
            "security", "hack", "hacked", "unauthorized", "breach", "suspicious",
            "fraud", "scam", "phishing", "malware", "virus",
        ],
    ),
    (
        "data_request",
        &[
            "data", "export", "download", "gdpr", "privacy", "information",
            "personal data", "data protection",
        ],
    ),
    (
        "integration_help",
        &[
            "integration", "api", "webhook", "oauth", "sdk", "plugin",
            "third party", "connect", "sync",
        ],
    ),
];

const FALLBACK_INTENT: &str = "general_inquiry";

/// Checked most urgent first; the first level with a hit wins.
const URGENCY_KEYWORDS: &[(Urgency, f64, &[&str])] = &[
    (
        Urgency::Critical,
        0.9,
        &[
            "urgent", "critical", "emergency", "asap", "immediately", "right now",
            "down", "outage", "broken", "can't access", "unable to", "blocked",
            "losing money", "production", "hacked", "security breach",
        ],
    ),
    (
        Urgency::High,
        0.8,
        &[
            "important", "need help", "problem", "issue", "can't", "cannot",
            "doesn't work", "not working", "error", "failing", "soon",
            "business impact",
        ],
    ),
    (
        Urgency::Medium,
        0.7,
        &[
            "question", "how to", "how do i", "help", "assistance",
            "wondering", "clarify", "explain",
        ],
    ),
    (
        Urgency::Low,
        0.7,
        &[
            "suggestion", "feature", "enhancement", "when possible",
            "sometime", "eventually", "minor", "nice to have",
        ],
    ),
];

const DEFAULT_URGENCY_CONFIDENCE: f64 = 0.6;

const POSITIVE_WORDS: &[&str] = &[
    "thanks", "thank you", "great", "love", "awesome", "excellent", "happy",
    "appreciate", "helpful", "good", "perfect", "amazing", "wonderful", "pleased",
];

const NEGATIVE_WORDS: &[&str] = &[
    "not working", "broken", "error", "fail", "failed", "failing", "angry",
    "frustrated", "terrible", "awful", "worst", "disappointed", "unacceptable",
    "bad", "crash", "cannot", "can't", "unable", "annoyed", "ridiculous", "hate",
    "charged", "wrong", "never",
];

/// Below this confidence the sentiment is reported as neutral.
const NEUTRAL_BAND: f64 = 0.55;

/// Bodies shorter than this are summarized by their subject.
const SHORT_BODY_WORDS: usize = 20;
const SHORT_BODY_FALLBACK_CHARS: usize = 100;

/// One regex per keyword so overlapping keywords each count.
fn keyword_regexes(keywords: &[&str]) -> Result<Vec<Regex>> {
    keywords
        .iter()
        .map(|k| {
            Regex::new(&format!(r"\b{}\b", regex::escape(k)))
                .map_err(|e| Error::gateway_init(format!("keyword matcher {}: {}", k, e)))
        })
        .collect()
}

/// One alternation regex per label: `\b(?:kw1|kw2|..)\b`.
fn keyword_regex(keywords: &[&str]) -> Result<Regex> {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{})\b", alternation))
        .map_err(|e| Error::gateway_init(format!("keyword matcher: {}", e)))
}

/// FNV-1a, stable across processes and releases.
fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Deterministic heuristic gateway.
pub struct LocalGateway {
    intents: Vec<(&'static str, Vec<Regex>)>,
    urgencies: Vec<(Urgency, f64, Regex)>,
    positive: Regex,
    negative: Regex,
    sentence: Regex,
    max_summary_words: usize,
    model_version: String,
}

impl LocalGateway {
    /// Compiles the keyword matchers.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        if !(MIN_SUMMARY_WORDS..=MAX_SUMMARY_WORDS).contains(&config.max_summary_length) {
            return Err(Error::gateway_init(format!(
                "max_summary_length {} outside {}..={}",
                config.max_summary_length, MIN_SUMMARY_WORDS, MAX_SUMMARY_WORDS
            )));
        }

        let intents = INTENT_KEYWORDS
            .iter()
            .map(|(label, kws)| -> Result<_> { Ok((*label, keyword_regexes(kws)?)) })
            .collect::<Result<Vec<_>>>()?;
        let urgencies = URGENCY_KEYWORDS
            .iter()
            .map(|(level, conf, kws)| -> Result<_> { Ok((*level, *conf, keyword_regex(kws)?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            intents,
            urgencies,
            positive: keyword_regex(POSITIVE_WORDS)?,
            negative: keyword_regex(NEGATIVE_WORDS)?,
            sentence: Regex::new(r"[^.!?]+[.!?]*")
                .map_err(|e| Error::gateway_init(format!("sentence splitter: {}", e)))?,
            max_summary_words: config.max_summary_length,
            model_version: config.model_version.clone(),
        })
    }

    fn text(ticket: &RawTicket) -> String {
        format!("{} {}", ticket.subject, ticket.body).to_lowercase()
    }

    /// Highest keyword count wins; ties go to the earlier category.
    pub fn classify_intent(&self, text: &str) -> (String, f64) {
        if text.trim().is_empty() {
            return (FALLBACK_INTENT.to_string(), 0.0);
        }

        let mut best: Option<(&str, usize)> = None;
        for (label, keywords) in &self.intents {
            let hits: usize = keywords.iter().map(|re| re.find_iter(text).count()).sum();
            if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
                best = Some((*label, hits));
            }
        }

        match best {
            Some((label, hits)) => (label.to_string(), (hits as f64 / 3.0).min(1.0)),
            None => (FALLBACK_INTENT.to_string(), 0.5),
        }
    }

    pub fn classify_urgency(&self, priority: Option<Urgency>, text: &str) -> (Urgency, f64) {
        if let Some(explicit) = priority {
            return (explicit, 1.0);
        }

        self.urgencies
            .iter()
            .find(|(_, _, re)| re.is_match(text))
            .map(|(level, conf, _)| (*level, *conf))
            .unwrap_or((Urgency::Medium, DEFAULT_URGENCY_CONFIDENCE))
    }

    pub fn classify_sentiment(&self, text: &str) -> (Sentiment, f64) {
        let pos = self.positive.find_iter(text).count();
        let neg = self.negative.find_iter(text).count();
        let total = pos + neg;
        if total == 0 || pos == neg {
            return (Sentiment::Neutral, 0.5);
        }

        let margin = pos.abs_diff(neg) as f64 / (total as f64 + 1.0);
        let confidence = 0.5 + 0.5 * margin;
        if confidence < NEUTRAL_BAND {
            return (Sentiment::Neutral, 0.5);
        }

        let label = if pos > neg {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        };
        (label, confidence)
    }

    /// Feature-hashed token vector, L2-normalized. Subject tokens count double.
    pub fn embed(&self, subject: &str, body: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];

        let weighted = [(subject, 2.0f32), (body, 1.0f32)];
        for (text, weight) in weighted {
            for token in text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                let hash = fnv1a(&token.to_lowercase());
                let idx = (hash % EMBEDDING_DIM as u64) as usize;
                let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
                vector[idx] += sign * weight;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    /// Extractive summary capped at `max_summary_words` words.
    pub fn summarize(&self, subject: &str, body: &str) -> String {
        let subject = subject.trim();
        let body = body.trim();

        if body.is_empty() {
            return subject.to_string();
        }
        if body.split_whitespace().count() < SHORT_BODY_WORDS {
            return if subject.is_empty() {
                ticket_core::limits::truncate_chars(body, SHORT_BODY_FALLBACK_CHARS)
            } else {
                subject.to_string()
            };
        }

        let mut words: Vec<&str> = Vec::new();
        for sentence in self.sentence.find_iter(body) {
            words.extend(sentence.as_str().split_whitespace());
            if words.len() >= self.max_summary_words {
                break;
            }
        }

        if words.len() > self.max_summary_words {
            words.truncate(self.max_summary_words);
            format!("{}...", words.join(" "))
        } else {
            words.join(" ")
        }
    }
}

#[async_trait]
impl EnrichmentGateway for LocalGateway {
    async fn enrich(&self, ticket: &RawTicket) -> Result<EnrichmentResult> {
        let text = Self::text(ticket);

        let (intent, intent_confidence) = self.classify_intent(&text);
        let (urgency, urgency_confidence) = self.classify_urgency(ticket.priority, &text);
        let (sentiment, sentiment_confidence) = self.classify_sentiment(&text);

        debug!(
            ticket_id = %ticket.ticket_id,
            intent = %intent,
            urgency = %urgency,
            sentiment = %sentiment,
            "Classified ticket"
        );

        Ok(EnrichmentResult {
            embedding: self.embed(&ticket.subject, &ticket.body),
            intent,
            intent_confidence,
            urgency,
            urgency_confidence,
            sentiment,
            sentiment_confidence,
            summary: self.summarize(&ticket.subject, &ticket.body),
            processed_at: Utc::now(),
            model_version: self.model_version.clone(),
        })
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
