//! Route rules
//!
//! A rule pairs destination patterns with the providers that carry calls to
//! them. Rules are built with two chaining operators:
//!
//! ```
//! use dialplan::domain::dialing::{ProviderDefinition, RouteRule};
//! use regex::Regex;
//!
//! let rule = (RouteRule::new() | Regex::new(r"^1\d{10}$").unwrap())
//!     >> ProviderDefinition::new("voip_ms");
//! assert!(rule.matches("15551234567"));
//! ```
//!
//! `>>` appends a provider, `|` appends a pattern; both merge when the right
//! hand side is another rule. Pattern order is match priority.

use super::provider::ProviderDefinition;
use crate::domain::shared::error::RouteDefinitionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, Shr};

/// Construction input for a rule; both lists default to empty
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRuleConfig {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub providers: Vec<ProviderDefinition>,
}

/// Right hand side of a checked composition
#[derive(Debug, Clone)]
pub enum RouteOperand {
    Rule(RouteRule),
    Provider(ProviderDefinition),
    Pattern(Regex),
    Text(String),
}

impl RouteOperand {
    fn describe(&self) -> String {
        match self {
            RouteOperand::Rule(_) => "route rule".to_string(),
            RouteOperand::Provider(p) => format!("provider {:?}", p.name),
            RouteOperand::Pattern(re) => format!("pattern /{}/", re.as_str()),
            RouteOperand::Text(s) => format!("text {:?}", s),
        }
    }
}

impl From<RouteRule> for RouteOperand {
    fn from(rule: RouteRule) -> Self {
        RouteOperand::Rule(rule)
    }
}

impl From<ProviderDefinition> for RouteOperand {
    fn from(provider: ProviderDefinition) -> Self {
        RouteOperand::Provider(provider)
    }
}

impl From<Regex> for RouteOperand {
    fn from(pattern: Regex) -> Self {
        RouteOperand::Pattern(pattern)
    }
}

impl From<&str> for RouteOperand {
    fn from(text: &str) -> Self {
        RouteOperand::Text(text.to_string())
    }
}

impl From<String> for RouteOperand {
    fn from(text: String) -> Self {
        RouteOperand::Text(text)
    }
}

/// Destination patterns plus the providers that serve them
#[derive(Debug, Clone, Default)]
pub struct RouteRule {
    patterns: Vec<Regex>,
    providers: Vec<ProviderDefinition>,
}

impl RouteRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(patterns: Vec<Regex>, providers: Vec<ProviderDefinition>) -> Self {
        Self {
            patterns,
            providers,
        }
    }

    /// Build a rule from configuration, compiling every pattern
    pub fn from_config(config: RouteRuleConfig) -> Result<Self, RouteDefinitionError> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with(patterns, config.providers))
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn providers(&self) -> &[ProviderDefinition] {
        &self.providers
    }

    /// Concatenate another rule's providers and patterns onto this one
    pub fn merge(&mut self, other: RouteRule) -> &mut Self {
        self.providers.extend(other.providers);
        self.patterns.extend(other.patterns);
        self
    }

    pub fn append_provider(&mut self, provider: ProviderDefinition) -> &mut Self {
        self.providers.push(provider);
        self
    }

    pub fn append_pattern(&mut self, pattern: Regex) -> &mut Self {
        self.patterns.push(pattern);
        self
    }

    /// Give `pattern` priority over every existing pattern
    pub fn unshift_pattern(&mut self, pattern: Regex) -> &mut Self {
        self.patterns.insert(0, pattern);
        self
    }

    /// Checked form of `>>`: accepts a rule or a provider
    pub fn try_append_provider(
        &mut self,
        operand: impl Into<RouteOperand>,
    ) -> Result<&mut Self, RouteDefinitionError> {
        match operand.into() {
            RouteOperand::Rule(rule) => Ok(self.merge(rule)),
            RouteOperand::Provider(provider) => Ok(self.append_provider(provider)),
            other => Err(RouteDefinitionError::UnrecognizedOperand {
                operator: ">>",
                operand: other.describe(),
            }),
        }
    }

    /// Checked form of `|`: accepts a rule, a pattern, or text compiled as a pattern
    pub fn try_append_pattern(
        &mut self,
        operand: impl Into<RouteOperand>,
    ) -> Result<&mut Self, RouteDefinitionError> {
        match operand.into() {
            RouteOperand::Rule(rule) => Ok(self.merge(rule)),
            RouteOperand::Pattern(pattern) => Ok(self.append_pattern(pattern)),
            RouteOperand::Text(text) => {
                let pattern = compile(&text)?;
                Ok(self.append_pattern(pattern))
            }
            other => Err(RouteDefinitionError::UnrecognizedOperand {
                operator: "|",
                operand: other.describe(),
            }),
        }
    }

    /// True iff some pattern matches, tested in priority order
    pub fn matches(&self, candidate: impl AsRef<str>) -> bool {
        let candidate = candidate.as_ref();
        self.patterns.iter().any(|pattern| pattern.is_match(candidate))
    }

    /// First provider of this rule, if the rule matches `candidate`
    pub fn first_provider_for(&self, candidate: impl AsRef<str>) -> Option<&ProviderDefinition> {
        if self.matches(candidate) {
            self.providers.first()
        } else {
            None
        }
    }
}

impl Shr<ProviderDefinition> for RouteRule {
    type Output = RouteRule;

    fn shr(mut self, provider: ProviderDefinition) -> RouteRule {
        self.append_provider(provider);
        self
    }
}

impl Shr<RouteRule> for RouteRule {
    type Output = RouteRule;

    fn shr(mut self, other: RouteRule) -> RouteRule {
        self.merge(other);
        self
    }
}

impl BitOr<Regex> for RouteRule {
    type Output = RouteRule;

    fn bitor(mut self, pattern: Regex) -> RouteRule {
        self.append_pattern(pattern);
        self
    }
}

impl BitOr<RouteRule> for RouteRule {
    type Output = RouteRule;

    fn bitor(mut self, other: RouteRule) -> RouteRule {
        self.merge(other);
        self
    }
}

fn compile(pattern: &str) -> Result<Regex, RouteDefinitionError> {
    Regex::new(pattern).map_err(|source| RouteDefinitionError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Ordered route rules; the first matching rule decides the providers
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    rules: Vec<RouteRule>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(
        configs: impl IntoIterator<Item = RouteRuleConfig>,
    ) -> Result<Self, RouteDefinitionError> {
        let rules = configs
            .into_iter()
            .map(RouteRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn add(&mut self, rule: RouteRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn rule_for(&self, number: impl AsRef<str>) -> Option<&RouteRule> {
        let number = number.as_ref();
        self.rules.iter().find(|rule| rule.matches(number))
    }

    /// Providers for `number`, empty when no rule matches
    pub fn providers_for(&self, number: impl AsRef<str>) -> &[ProviderDefinition] {
        self.rule_for(number)
            .map(RouteRule::providers)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dialing::NumericalString;

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    fn provider_names(rule: &RouteRule) -> Vec<&str> {
        rule.providers().iter().map(|p| p.name.as_str()).collect()
    }

    fn pattern_sources(rule: &RouteRule) -> Vec<&str> {
        rule.patterns().iter().map(Regex::as_str).collect()
    }

    #[test]
    fn test_chained_composition() {
        let base = RouteRule::with(vec![re("^911$")], vec![ProviderDefinition::new("emergency")]);
        let rule = (base >> ProviderDefinition::new("backup")) | re(r"^1\d{10}$");

        assert_eq!(provider_names(&rule), vec!["emergency", "backup"]);
        assert_eq!(pattern_sources(&rule), vec!["^911$", r"^1\d{10}$"]);
    }

    #[test]
    fn test_merging_rules_concatenates_in_order() {
        let left = RouteRule::with(vec![re("^1")], vec![ProviderDefinition::new("a")]);
        let right = RouteRule::with(vec![re("^2")], vec![ProviderDefinition::new("b")]);
        let merged = left >> right;

        assert_eq!(provider_names(&merged), vec!["a", "b"]);
        assert_eq!(pattern_sources(&merged), vec!["^1", "^2"]);

        let piped = RouteRule::new() | merged;
        assert_eq!(pattern_sources(&piped), vec!["^1", "^2"]);
    }

    #[test]
    fn test_matches() {
        let rule = RouteRule::new() | re("^011") | re(r"^\+");
        assert!(rule.matches("01144123456"));
        assert!(rule.matches("+44123456"));
        assert!(!rule.matches("5551234"));
        assert!(!RouteRule::new().matches("anything"));
        assert!(rule.matches(NumericalString::new("0114")));
    }

    #[test]
    fn test_unshift_pattern_takes_priority() {
        let mut rule = RouteRule::new() | re("^1") | re("^2");
        rule.unshift_pattern(re("^0"));
        assert_eq!(pattern_sources(&rule), vec!["^0", "^1", "^2"]);
        assert!(rule.matches("0800"));
    }

    #[test]
    fn test_checked_operators_reject_wrong_operands() {
        let mut rule = RouteRule::new();

        let err = rule.try_append_provider(re("^1")).unwrap_err();
        assert!(matches!(err, RouteDefinitionError::UnrecognizedOperand { operator: ">>", .. }));

        let err = rule.try_append_provider("voip_ms").unwrap_err();
        assert!(matches!(err, RouteDefinitionError::UnrecognizedOperand { .. }));

        let err = rule
            .try_append_pattern(ProviderDefinition::new("voip_ms"))
            .unwrap_err();
        assert!(matches!(err, RouteDefinitionError::UnrecognizedOperand { operator: "|", .. }));

        let err = rule.try_append_pattern("([unclosed").unwrap_err();
        assert!(matches!(err, RouteDefinitionError::InvalidPattern { .. }));

        assert!(rule.patterns().is_empty());
        assert!(rule.providers().is_empty());
    }

    #[test]
    fn test_checked_operators_accept_valid_operands() {
        let mut rule = RouteRule::new();
        rule.try_append_pattern(r"^9\d+$")
            .unwrap()
            .try_append_provider(ProviderDefinition::new("local"))
            .unwrap()
            .try_append_pattern(RouteRule::new() | re("^8"))
            .unwrap();

        assert_eq!(pattern_sources(&rule), vec![r"^9\d+$", "^8"]);
        assert_eq!(provider_names(&rule), vec!["local"]);
        assert_eq!(rule.first_provider_for("955").unwrap().name, "local");
        assert!(rule.first_provider_for("755").is_none());
    }

    #[test]
    fn test_routing_table_first_match_wins() {
        let table = RoutingTable::from_config(vec![
            RouteRuleConfig {
                patterns: vec!["^911$".to_string()],
                providers: vec![ProviderDefinition::new("emergency")],
            },
            RouteRuleConfig {
                patterns: vec![r"^\d+$".to_string()],
                providers: vec![ProviderDefinition::new("voip_ms"), ProviderDefinition::new("backup")],
            },
        ])
        .unwrap();

        assert_eq!(table.providers_for("911")[0].name, "emergency");
        assert_eq!(table.providers_for("5551234").len(), 2);
        assert!(table.providers_for("*72").is_empty());
    }

    #[test]
    fn test_config_with_bad_pattern_fails() {
        let result = RouteRule::from_config(RouteRuleConfig {
            patterns: vec!["(".to_string()],
            providers: Vec::new(),
        });
        assert!(result.is_err());
    }
}
