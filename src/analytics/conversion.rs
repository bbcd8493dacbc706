//! Win rates overall, by deal stage and by agent

use crate::data::{Opportunity, Tables};
use crate::error::Result;
use crate::types::Percentage;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupConversion {
    pub key: String,
    pub opportunities: usize,
    pub won: usize,
    pub rate: Percentage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionAnalysis {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub rate: Option<Percentage>,
    /// Descending by rate
    pub by_stage: Vec<GroupConversion>,
    /// Descending by rate
    pub by_agent: Vec<GroupConversion>,
}

/// Group conversion rates, highest first; ties keep key order
fn group_rates<'a, F>(opportunities: &'a [Opportunity], key: F) -> Vec<GroupConversion>
where
    F: Fn(&'a Opportunity) -> &'a str,
{
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for opp in opportunities {
        let entry = groups.entry(key(opp)).or_default();
        entry.0 += 1;
        if opp.is_won {
            entry.1 += 1;
        }
    }

    let mut rates: Vec<GroupConversion> = groups
        .into_iter()
        .map(|(key, (total, won))| GroupConversion {
            key: key.to_string(),
            opportunities: total,
            won,
            rate: won as f64 / total as f64 * 100.0,
        })
        .collect();
    rates.sort_by(|a, b| b.rate.partial_cmp(&a.rate).unwrap_or(std::cmp::Ordering::Equal));
    rates
}

pub fn analyze_conversion(tables: &Tables) -> Result<ConversionAnalysis> {
    let opportunities = &tables.opportunities;
    let total = opportunities.len();
    let won = opportunities.iter().filter(|o| o.is_won).count();
    let lost = opportunities.iter().filter(|o| o.is_lost).count();

    Ok(ConversionAnalysis {
        total,
        won,
        lost,
        rate: super::rate(won, total),
        by_stage: group_rates(opportunities, |o| o.deal_stage.as_str()),
        by_agent: group_rates(opportunities, |o| o.agent_id.as_str()),
    })
}
