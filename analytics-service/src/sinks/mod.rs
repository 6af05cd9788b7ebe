pub mod pg_cardiac_risk;
pub mod pg_measurement;

pub use pg_cardiac_risk::PgCardiacRiskSink;
pub use pg_measurement::PgMeasurementSink;

use std::collections::{hash_map::Entry, HashMap};

use crate::pipeline::Envelope;

/// Collapse a batch to one envelope per key, keeping the last occurrence in
/// the position where the key was first seen.
///
/// A multi-row `ON CONFLICT DO UPDATE` statement cannot touch the same row
/// twice, so batches must be collapsed by primary key before flushing.
pub(crate) fn dedupe_last_by_key<T, K, F>(batch: &[Envelope<T>], key: F) -> Vec<&Envelope<T>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<&Envelope<T>> = Vec::with_capacity(batch.len());

    for env in batch {
        match positions.entry(key(&env.payload)) {
            Entry::Occupied(slot) => out[*slot.get()] = env,
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(env);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_last_value_per_key() {
        let batch = vec![
            Envelope::now((1, "a")),
            Envelope::now((2, "b")),
            Envelope::now((1, "c")),
        ];

        let deduped = dedupe_last_by_key(&batch, |&(id, _)| id);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].payload, (1, "c"));
        assert_eq!(deduped[1].payload, (2, "b"));
    }
}
