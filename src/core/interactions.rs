use super::events::CgtEvent;
use std::collections::HashMap;

/// Flag events whose cost base may have been changed by an earlier event on the
/// same asset. Advisory only: nothing is recalculated.
///
/// Returns the events in their original order, with warnings attached.
pub fn detect_cost_base_interactions(events: Vec<CgtEvent>) -> Vec<CgtEvent> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, event) in events.iter().enumerate() {
        let key = event.asset.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(idx);
    }

    let mut warnings: HashMap<usize, String> = HashMap::new();
    for (asset, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        // stable: events on the same day keep feed order
        members.sort_by_key(|&i| events[i].disposal_date);

        for (pos, &idx) in members.iter().enumerate().skip(1) {
            let prior: Vec<String> = members[..pos]
                .iter()
                .map(|&p| &events[p])
                .filter(|e| e.kind.modifies_cost_base())
                .map(|e| format!("{} on {}", e.kind.display(), e.disposal_date))
                .collect();
            if prior.is_empty() {
                continue;
            }
            log::debug!(
                "{}: {} earlier event(s) on '{}' may affect cost base",
                events[idx].source_transaction_id,
                prior.len(),
                asset
            );
            warnings.insert(
                idx,
                format!(
                    "Cost base may be affected by {} earlier event(s) on this asset: {}",
                    prior.len(),
                    prior.join(", ")
                ),
            );
        }
    }

    events
        .into_iter()
        .enumerate()
        .map(|(idx, event)| match warnings.remove(&idx) {
            Some(warning) => CgtEvent {
                cost_base_warning: Some(warning),
                ..event
            },
            None => event,
        })
        .collect()
}
