//! Recommendation mapper
//!
//! Translates risk-driving feature names into canned HR interventions. The
//! knowledge base is an ordered list of rules; for each feature the rules
//! are scanned in order and the first whose matcher is a case-insensitive
//! substring of the feature name wins. Results are deduplicated and keep
//! first-seen order.

use crate::errors::{Result, RetentionError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A single knowledge-base entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Substring looked for in the lowercased feature name
    pub matcher: String,
    /// Short headline of the intervention
    pub title: String,
    /// What HR should do about it
    pub action: String,
}

impl Rule {
    pub fn new(matcher: &str, title: &str, action: &str) -> Self {
        Self {
            matcher: matcher.to_lowercase(),
            title: title.to_string(),
            action: action.to_string(),
        }
    }

    pub fn matches(&self, feature: &str) -> bool {
        feature.to_lowercase().contains(&self.matcher)
    }

    fn recommendation(&self) -> Recommendation {
        Recommendation {
            key: self.matcher.clone(),
            title: self.title.clone(),
            action: self.action.clone(),
        }
    }
}

/// A recommendation emitted for an analysed employee
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recommendation {
    /// Matcher of the rule that produced it
    pub key: String,
    pub title: String,
    pub action: String,
}

/// Ordered rule list
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    rules: Vec<Rule>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl KnowledgeBase {
    /// Build a knowledge base from rules in priority order
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(RetentionError::Config(
                "knowledge base must contain at least one rule".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(rules.len());
        for rule in rules {
            let matcher = rule.matcher.trim().to_lowercase();
            if matcher.is_empty() {
                return Err(RetentionError::Config(format!(
                    "recommendation rule '{}' has an empty matcher",
                    rule.title
                )));
            }
            if !seen.insert(matcher.clone()) {
                return Err(RetentionError::Config(format!(
                    "duplicate recommendation matcher: {matcher}"
                )));
            }
            normalized.push(Rule { matcher, ..rule });
        }

        Ok(Self { rules: normalized })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching a feature name, if any
    pub fn lookup(&self, feature: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(feature))
    }

    /// Map risk features to a deduplicated recommendation set
    pub fn recommend<S: AsRef<str>>(&self, features: &[S]) -> Vec<Recommendation> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for feature in features {
            let feature = feature.as_ref();
            match self.lookup(feature) {
                Some(rule) => {
                    if seen.insert(rule.matcher.as_str()) {
                        out.push(rule.recommendation());
                    }
                }
                None => debug!(feature, "no recommendation rule matches"),
            }
        }

        out
    }
}

fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "overtime_yes",
            "High Burnout Risk",
            "Audit the team's workload. Consider additional hiring or task rotation.",
        ),
        Rule::new(
            "monthlyincome",
            "Compensation Gap",
            "Check market salary benchmarks. Consider a salary adjustment or a performance bonus.",
        ),
        Rule::new(
            "stockoptionlevel",
            "Ownership Issue",
            "The employee feels little ownership of the company. Offer stock options (ESOP) or a long-term bonus.",
        ),
        Rule::new(
            "jobrole_sales representative",
            "High Turnover Role",
            "Sales Representative is a very exposed position. Rework the commission scheme and target incentives.",
        ),
        Rule::new(
            "totalworkingyears",
            "Junior Retention",
            "Risk is high in the first working years. Strengthen mentoring and onboarding.",
        ),
        Rule::new(
            "distancefromhome",
            "Commute Stress",
            "Long commute. Offer a work-from-home option or a transport allowance.",
        ),
        Rule::new(
            "yearsatcompany",
            "Loyalty Fade",
            "Fatigue after a long tenure. Offer a rotation to another division (internal mobility).",
        ),
        Rule::new(
            "jobinvolvement",
            "Disengagement",
            "Low involvement. The manager should hold a stay interview to learn the employee's career aspirations.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_default_order() {
        let kb = KnowledgeBase::default();
        let matchers: Vec<&str> = kb.rules().iter().map(|r| r.matcher.as_str()).collect();
        assert_eq!(
            matchers,
            vec![
                "overtime_yes",
                "monthlyincome",
                "stockoptionlevel",
                "jobrole_sales representative",
                "totalworkingyears",
                "distancefromhome",
                "yearsatcompany",
                "jobinvolvement",
            ]
        );
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let kb = KnowledgeBase::default();
        let recs = kb.recommend(&["overtime_Yes", "MonthlyIncome", "jobrole_Sales Representative"]);
        assert_eq!(
            keys(&recs),
            vec!["overtime_yes", "monthlyincome", "jobrole_sales representative"]
        );
        assert_eq!(recs[0].title, "High Burnout Risk");
    }

    #[test]
    fn test_unmatched_and_empty_inputs() {
        let kb = KnowledgeBase::default();
        assert!(kb.recommend::<&str>(&[]).is_empty());
        assert!(kb.recommend(&["age", "overtime_No", "department_Sales"]).is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let kb = KnowledgeBase::default();
        let recs = kb.recommend(&["yearsatcompany", "age", "yearsatcompany"]);
        assert_eq!(keys(&recs), vec!["yearsatcompany"]);
    }

    #[test]
    fn test_repeated_and_permuted_inputs_agree() {
        let kb = KnowledgeBase::default();
        let features = [
            "overtime_Yes",
            "distancefromhome",
            "age",
            "stockoptionlevel",
            "monthlyincome",
        ];
        let first = kb.recommend(&features);
        assert_eq!(first.len(), 4);
        for _ in 0..10 {
            assert_eq!(kb.recommend(&features), first);
        }

        let expected: HashSet<Recommendation> = first.iter().cloned().collect();
        let mut permuted = features.to_vec();
        for shift in 1..permuted.len() {
            permuted.rotate_left(1);
            let recs = kb.recommend(&permuted);
            assert_eq!(recs.len(), first.len(), "shift {shift}");
            assert_eq!(recs.into_iter().collect::<HashSet<_>>(), expected);
        }
        permuted.reverse();
        assert_eq!(kb.recommend(&permuted).into_iter().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn test_first_rule_wins() {
        let kb = KnowledgeBase::from_rules(vec![
            Rule::new("years", "Tenure", "generic"),
            Rule::new("yearsatcompany", "Loyalty Fade", "specific"),
        ])
        .unwrap();
        let recs = kb.recommend(&["yearsatcompany"]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].title, "Tenure");
    }

    #[test]
    fn test_from_rules_rejects_bad_input() {
        assert!(KnowledgeBase::from_rules(Vec::new()).is_err());
        assert!(KnowledgeBase::from_rules(vec![Rule::new("  ", "Empty", "x")]).is_err());
        assert!(KnowledgeBase::from_rules(vec![
            Rule::new("age", "A", "x"),
            Rule::new("AGE", "B", "y"),
        ])
        .is_err());
    }
}
