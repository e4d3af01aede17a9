//! Bot classification.
//!
//! A pure function of a session's attributes and the country mix of the
//! population it is reported with. Rules, first match wins:
//!
//! 1. No user agent: `unknown`
//! 2. User agent matches a known automation pattern: `bot`
//! 3. woothee classifies the agent as a crawler: `bot`
//! 4. No engagement from a country holding a disproportionate share of the
//!    population: `bot`
//! 5. woothee cannot identify the agent and there was no engagement: `unknown`
//! 6. Otherwise: `real`

use std::collections::HashMap;
use std::sync::LazyLock;

use event_store::SessionRollup;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;
use woothee::parser::Parser;

use crate::{percentage, round1};

const BOT_PATTERN: &str = r"bot|crawl|spider|slurp|scrap|headless|phantomjs|puppeteer|playwright|selenium|webdriver|lighthouse|pingdom|uptime|monitor|python-requests|python-urllib|curl/|wget/|go-http-client|java/|okhttp|axios/|node-fetch|libwww|httpclient";

static BOT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(BOT_PATTERN)
        .case_insensitive(true)
        .build()
        .expect("invalid bot pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotClass {
    Real,
    Bot,
    Unknown,
}

/// Tunable thresholds. Defaults are conservative.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BotPolicy {
    /// Extra case-insensitive user-agent patterns treated as bots.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
    /// Country share (percent) above which unengaged sessions are suspect.
    #[serde(default = "default_country_share")]
    pub country_share_threshold: f64,
    /// Population size below which the country rule is skipped.
    #[serde(default = "default_min_population")]
    pub min_population: usize,
}

fn default_country_share() -> f64 {
    60.0
}

fn default_min_population() -> usize {
    50
}

impl Default for BotPolicy {
    fn default() -> Self {
        Self {
            extra_patterns: Vec::new(),
            country_share_threshold: default_country_share(),
            min_population: default_min_population(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotReport {
    pub real: u64,
    pub bot: u64,
    pub unknown: u64,
    pub bot_percentage: f64,
}

impl BotReport {
    pub fn total(&self) -> u64 {
        self.real + self.bot + self.unknown
    }

    fn add(&mut self, class: BotClass) {
        match class {
            BotClass::Real => self.real += 1,
            BotClass::Bot => self.bot += 1,
            BotClass::Unknown => self.unknown += 1,
        }
        self.bot_percentage = round1(percentage(self.bot, self.total()));
    }
}

/// Per-country session shares of a population, in percent.
#[derive(Debug, Clone, Default)]
pub struct CountryShares {
    shares: HashMap<String, f64>,
    population: usize,
}

impl CountryShares {
    pub fn of<'a>(rollups: impl IntoIterator<Item = &'a SessionRollup>) -> Self {
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut population = 0usize;
        for rollup in rollups {
            population += 1;
            if let Some(country) = rollup.session.country.as_deref() {
                *counts.entry(country.to_ascii_uppercase()).or_default() += 1;
            }
        }
        let shares = counts
            .into_iter()
            .map(|(country, n)| (country, percentage(n, population as u64)))
            .collect();
        Self { shares, population }
    }

    pub fn share(&self, country: &str) -> f64 {
        self.shares
            .get(&country.to_ascii_uppercase())
            .copied()
            .unwrap_or(0.0)
    }
}

pub struct BotClassifier {
    policy: BotPolicy,
    extra: Option<Regex>,
    parser: Parser,
}

impl BotClassifier {
    pub fn new(policy: BotPolicy) -> Self {
        let extra = if policy.extra_patterns.is_empty() {
            None
        } else {
            let pattern = policy
                .extra_patterns
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(error = %e, "Ignoring extra bot patterns");
                    None
                }
            }
        };

        Self {
            policy,
            extra,
            parser: Parser::new(),
        }
    }

    pub fn classify(&self, rollup: &SessionRollup, shares: &CountryShares) -> BotClass {
        let user_agent = match rollup.session.user_agent.as_deref().map(str::trim) {
            Some(ua) if !ua.is_empty() => ua,
            _ => return BotClass::Unknown,
        };

        if BOT_REGEX.is_match(user_agent)
            || self.extra.as_ref().is_some_and(|re| re.is_match(user_agent))
        {
            return BotClass::Bot;
        }

        let parsed = self.parser.parse(user_agent);
        if parsed.as_ref().is_some_and(|r| r.category == "crawler") {
            return BotClass::Bot;
        }

        let engaged = rollup.is_engaged();
        if !engaged && shares.population >= self.policy.min_population {
            if let Some(country) = rollup.session.country.as_deref() {
                if shares.share(country) > self.policy.country_share_threshold {
                    return BotClass::Bot;
                }
            }
        }

        let identified = parsed.is_some_and(|r| !r.name.is_empty() && r.name != "UNKNOWN");
        if !identified && !engaged {
            return BotClass::Unknown;
        }

        BotClass::Real
    }

    /// Classify a population, returning per-session classes and the totals.
    pub fn classify_all(&self, rollups: &[SessionRollup]) -> (Vec<BotClass>, BotReport) {
        let shares = CountryShares::of(rollups);
        let mut report = BotReport::default();
        let classes = rollups
            .iter()
            .map(|r| {
                let class = self.classify(r, &shares);
                report.add(class);
                class
            })
            .collect();
        (classes, report)
    }
}

impl Default for BotClassifier {
    fn default() -> Self {
        Self::new(BotPolicy::default())
    }
}
