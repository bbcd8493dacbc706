//! Sales performance rolled up by manager

use crate::data::Tables;
use crate::error::Result;
use crate::types::{Money, Percentage};
use hashbrown::HashMap;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerPerformance {
    pub manager: String,
    pub opportunities: usize,
    pub won: usize,
    pub total_close_value: Money,
    pub conversion_rate: Percentage,
    /// Total close value over won count; `None` with no wins
    pub avg_deal_size: Option<Money>,
}

/// Opportunities joined to their agent's manager, aggregated per manager and
/// ordered by total close value, largest first.
///
/// Opportunities whose agent has no manager are not attributed to anyone.
pub fn analyze_teams(tables: &Tables) -> Result<Vec<ManagerPerformance>> {
    let mut manager_of: HashMap<&str, &str> = HashMap::new();
    for member in &tables.sales_teams {
        manager_of
            .entry(member.agent_id.as_str())
            .or_insert(member.manager.as_str());
    }

    let mut groups: BTreeMap<&str, (usize, usize, Money)> = BTreeMap::new();
    let mut unattributed = 0usize;
    for opp in &tables.opportunities {
        let Some(&manager) = manager_of.get(opp.agent_id.as_str()) else {
            unattributed += 1;
            continue;
        };
        let entry = groups.entry(manager).or_default();
        entry.0 += 1;
        if opp.is_won {
            entry.1 += 1;
        }
        entry.2 += opp.close_value.unwrap_or(0.0);
    }
    if unattributed > 0 {
        log::debug!("{} opportunities have no manager", unattributed);
    }

    let mut performance: Vec<ManagerPerformance> = groups
        .into_iter()
        .map(|(manager, (opportunities, won, total))| ManagerPerformance {
            manager: manager.to_string(),
            opportunities,
            won,
            total_close_value: total,
            conversion_rate: won as f64 / opportunities as f64 * 100.0,
            avg_deal_size: (won > 0).then(|| total / won as f64),
        })
        .collect();
    performance.sort_by(|a, b| {
        b.total_close_value
            .partial_cmp(&a.total_close_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(performance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Opportunity, TeamMember};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_manager_rollup() {
        let d = NaiveDate::from_ymd_opt(2017, 4, 1).unwrap();
        let tables = Tables::new(
            vec![],
            vec![
                Opportunity::won("1", "A", "anna", d, 300.0),
                Opportunity::won("2", "B", "boris", d, 100.0),
                Opportunity::lost("3", "B", "boris", d),
                Opportunity::open("4", "cleo", "Engaging"),
                Opportunity::lost("5", "C", "dora", d),
                Opportunity::won("6", "C", "nobody", d, 999.0),
            ],
            vec![],
            vec![
                TeamMember::new("anna", "Mia"),
                TeamMember::new("boris", "Mia"),
                TeamMember::new("cleo", "Olaf"),
                TeamMember::new("dora", "Olaf"),
                TeamMember::new("anna", "Someone Else"),
            ],
        );

        let teams = analyze_teams(&tables).unwrap();
        assert_eq!(teams.len(), 2);

        let mia = &teams[0];
        assert_eq!(mia.manager, "Mia");
        assert_eq!(mia.opportunities, 3);
        assert_eq!(mia.won, 2);
        assert_relative_eq!(mia.total_close_value, 400.0);
        assert_relative_eq!(mia.conversion_rate, 200.0 / 3.0);
        assert_relative_eq!(mia.avg_deal_size.unwrap(), 200.0);

        let olaf = &teams[1];
        assert_eq!(olaf.opportunities, 2);
        assert_eq!(olaf.won, 0);
        assert_eq!(olaf.conversion_rate, 0.0);
        assert_eq!(olaf.avg_deal_size, None);
    }
}
