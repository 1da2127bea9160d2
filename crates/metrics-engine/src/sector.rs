use std::collections::{BTreeMap, HashMap};

use metrics_core::{MetricsError, MetricsResult, SectorPerformance, SymbolSector, YearlyReturn};

use crate::stats;

/// Index the sector lookup by symbol. Each symbol may appear once.
pub fn sector_lookup(symbols: &[SymbolSector]) -> MetricsResult<HashMap<&str, &SymbolSector>> {
    let mut lookup = HashMap::with_capacity(symbols.len());
    for entry in symbols {
        if lookup.insert(entry.symbol.as_str(), entry).is_some() {
            return Err(MetricsError::InvalidData(format!(
                "symbol {} appears more than once in the sector lookup",
                entry.symbol
            )));
        }
    }
    Ok(lookup)
}

pub struct SectorAggregator;

impl SectorAggregator {
    /// Mean yearly return per sector, best sector first.
    ///
    /// Symbols missing from the lookup are kept in a group with no sector label.
    /// Undefined yearly returns are skipped when averaging.
    pub fn aggregate(
        yearly: &[YearlyReturn],
        symbols: &[SymbolSector],
    ) -> MetricsResult<Vec<SectorPerformance>> {
        let lookup = sector_lookup(symbols)?;

        let mut groups: BTreeMap<Option<&str>, Vec<f64>> = BTreeMap::new();
        for y in yearly {
            let sector = lookup.get(y.symbol.as_str()).map(|s| s.sector.as_str());
            let bucket = groups.entry(sector).or_default();
            if let Some(r) = y.yearly_return {
                bucket.push(r);
            }
        }

        let unmatched = groups.get(&None).map(Vec::len).unwrap_or(0);
        if unmatched > 0 {
            tracing::debug!("{} yearly returns without a defined sector match", unmatched);
        }

        let mut out: Vec<SectorPerformance> = groups
            .into_iter()
            .map(|(sector, returns)| SectorPerformance {
                sector: sector.map(str::to_string),
                yearly_return: stats::mean(&returns),
            })
            .collect();

        out.sort_by(|a, b| stats::cmp_defined_first(a.yearly_return, b.yearly_return, true));
        Ok(out)
    }
}
