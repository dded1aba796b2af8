use super::{TickIter, tick_iter::Mark, util};
use crate::error::{Error, Result};

/// Marks for a manual value table: exactly the table keys, in declared order,
/// all at level 0.
///
/// The keys must be strictly monotonic and must lie inside `domain`.
pub(crate) fn table_marks(table: &[(f64, String)], domain: (f64, f64)) -> Result<TickIter<f64>> {
    if table.is_empty() {
        return Err(Error::config("manual scale needs a value table"));
    }

    let keys: Vec<f64> = table.iter().map(|(value, _)| *value).collect();
    if keys.len() > 1 && util::strict_direction(&keys).is_none() {
        let at = util::first_turn(&keys).unwrap_or(0);
        return Err(Error::degenerate(format!(
            "manual table is not monotonically ordered at entry {at}"
        )));
    }

    let (min, max) = util::sorted_pair(domain.0, domain.1);
    let slack = (max - min).abs() * 1e-9;
    if let Some(value) = keys.iter().find(|v| **v < min - slack || **v > max + slack) {
        return Err(Error::OutOfDomain {
            value: *value,
            min,
            max,
        });
    }

    Ok(TickIter::from_vec(
        keys.into_iter()
            .map(|value| Mark { value, level: 0 })
            .collect(),
    ))
}
