//! The analysis pipeline: encode, score, attribute, recommend
//!
//! Runs synchronously once per request against an `AnalysisContext`. The
//! pipeline keeps no state between calls, so analysing the same record twice
//! yields identical reports.

use crate::attribution::{Attributor, FeatureAttribution, TreeShapExplainer};
use crate::config::AnalysisConfig;
use crate::context::AnalysisContext;
use crate::encoding::encode_record;
use crate::errors::Result;
use crate::recommendations::Recommendation;
use crate::record::{EmployeeProfile, RawRecord};
use crate::scorer::score_row;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

/// Coarse risk level shown to HR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    Low,
    Moderate,
    Critical,
}

impl RiskBand {
    /// Band for a probability under the given policy (both bounds exclusive)
    pub fn from_probability(probability: f64, policy: &AnalysisConfig) -> Self {
        if probability > policy.critical_threshold {
            RiskBand::Critical
        } else if probability > policy.moderate_threshold {
            RiskBand::Moderate
        } else {
            RiskBand::Low
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskBand::Low => "LOW RISK",
            RiskBand::Moderate => "MODERATE RISK",
            RiskBand::Critical => "CRITICAL RISK",
        };
        f.write_str(label)
    }
}

/// Outcome of analysing one employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Probability of attrition
    pub probability: f64,
    /// 1 if the employee is predicted to leave
    pub class: u8,
    pub band: RiskBand,
    /// `probability * replacement_cost`
    pub expected_loss: f64,
    /// Expected margin the attributions are measured against
    pub base_value: f64,
    /// Largest attributions of any sign
    pub top_drivers: Vec<FeatureAttribution>,
    /// Largest positive attributions, fed to the recommendation mapper
    pub risky_features: Vec<FeatureAttribution>,
    pub recommendations: Vec<Recommendation>,
}

impl RiskReport {
    /// True when no recommendation applies
    pub fn no_critical_risk(&self) -> bool {
        self.recommendations.is_empty()
    }

    pub fn predicts_attrition(&self) -> bool {
        self.class == 1
    }
}

/// Analyse one raw record
#[instrument(skip_all, fields(fields = record.len()))]
pub fn analyze(ctx: &AnalysisContext, record: &RawRecord) -> Result<RiskReport> {
    let registry = ctx.registry();
    let model = ctx.model();
    let policy = ctx.policy();

    let row = encode_record(record, registry);
    let score = score_row(model, registry, &row)?;
    let attribution = TreeShapExplainer::new(model).attribute(&row, registry)?;

    let top_drivers = attribution.top_drivers(registry, policy.top_drivers)?;
    let risky_features = attribution.risk_drivers(registry, policy.top_k)?;

    let names: Vec<&str> = risky_features.iter().map(|a| a.feature.as_str()).collect();
    let recommendations = ctx.knowledge_base().recommend(&names);

    debug!(
        probability = score.probability,
        risky = ?names,
        recommendations = recommendations.len(),
        "record analysed"
    );

    Ok(RiskReport {
        probability: score.probability,
        class: score.class,
        band: RiskBand::from_probability(score.probability, policy),
        expected_loss: score.probability * policy.replacement_cost,
        base_value: attribution.base_value(),
        top_drivers,
        risky_features,
        recommendations,
    })
}

/// Validate and analyse a typed profile
pub fn analyze_profile(ctx: &AnalysisContext, profile: &EmployeeProfile) -> Result<RiskReport> {
    profile.validate()?;
    analyze(ctx, &profile.to_raw_record())
}
