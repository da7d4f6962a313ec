use crate::model::*;

/// Two ledger entries double-booking the same room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict<'a> {
    pub first: &'a BookingRecord,
    pub second: &'a BookingRecord,
}

/// Pairwise O(m²) scan. Pairs come out in ledger order (`first` precedes
/// `second`). Nothing is mutated or resolved.
pub fn detect_conflicts(records: &[BookingRecord]) -> Vec<Conflict<'_>> {
    let mut conflicts = Vec::new();
    for (i, first) in records.iter().enumerate() {
        for second in &records[i + 1..] {
            if first.conflicts_with(second) {
                conflicts.push(Conflict { first, second });
            }
        }
    }
    conflicts
}
