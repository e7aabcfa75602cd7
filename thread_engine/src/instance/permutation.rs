//! Permutation bookkeeping over an assignment list. An actor's permutation
//! index at a cursor is how many distinct slots it has occupied in
//! `assignments[..=cursor]`.

use std::collections::BTreeSet;

use scene_formats::ObjectRef;

use crate::error::ThreadError;
use crate::resolver::Assignment;

pub fn slot_of(assignment: &[ObjectRef], actor: ObjectRef) -> Option<usize> {
    assignment.iter().position(|bound| *bound == actor)
}

pub fn unique_permutations(assignments: &[Assignment], actor: ObjectRef) -> usize {
    assignments
        .iter()
        .filter_map(|assignment| slot_of(assignment, actor))
        .collect::<BTreeSet<_>>()
        .len()
}

fn missing(actor: ObjectRef, index: usize) -> ThreadError {
    ThreadError::InconsistentState(format!(
        "actor {actor} is missing from assignment {index}"
    ))
}

pub fn permutation_index(
    assignments: &[Assignment],
    cursor: usize,
    actor: ObjectRef,
) -> Result<usize, ThreadError> {
    if cursor >= assignments.len() {
        return Err(ThreadError::InconsistentState(format!(
            "assignment cursor {cursor} is out of range ({} assignments)",
            assignments.len()
        )));
    }
    let mut seen = BTreeSet::new();
    for (index, assignment) in assignments[..=cursor].iter().enumerate() {
        let slot = slot_of(assignment, actor).ok_or_else(|| missing(actor, index))?;
        seen.insert(slot);
    }
    Ok(seen.len())
}

/// Cursor of the assignment that moves `actor` to its next distinct slot,
/// wrapping back to the first. `None` when the actor only ever has one slot.
pub fn next_permutation_cursor(
    assignments: &[Assignment],
    cursor: usize,
    actor: ObjectRef,
) -> Result<Option<usize>, ThreadError> {
    let unique = unique_permutations(assignments, actor);
    if unique < 2 {
        return Ok(None);
    }
    let current = permutation_index(assignments, cursor, actor)?;
    let target = if current >= unique { 1 } else { current + 1 };

    let mut seen = BTreeSet::new();
    for (index, assignment) in assignments.iter().enumerate() {
        let slot = slot_of(assignment, actor).ok_or_else(|| missing(actor, index))?;
        seen.insert(slot);
        if seen.len() == target {
            return Ok(Some(index));
        }
    }
    Err(ThreadError::InconsistentState(format!(
        "actor {actor} never reaches permutation {target}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ObjectRef = ObjectRef(0xA);
    const B: ObjectRef = ObjectRef(0xB);
    const C: ObjectRef = ObjectRef(0xC);

    fn three_way() -> Vec<Assignment> {
        vec![
            vec![A, B, C],
            vec![A, C, B],
            vec![B, A, C],
            vec![C, A, B],
            vec![B, C, A],
        ]
    }

    #[test]
    fn counts_distinct_slots() {
        let assignments = three_way();
        assert_eq!(unique_permutations(&assignments, A), 3);
        assert_eq!(unique_permutations(&[vec![A, B]], A), 1);
        assert_eq!(unique_permutations(&assignments, ObjectRef(1)), 0);
    }

    #[test]
    fn index_counts_slots_seen_so_far() -> Result<(), ThreadError> {
        let assignments = three_way();
        assert_eq!(permutation_index(&assignments, 0, A)?, 1);
        assert_eq!(permutation_index(&assignments, 1, A)?, 1);
        assert_eq!(permutation_index(&assignments, 2, A)?, 2);
        assert_eq!(permutation_index(&assignments, 4, A)?, 3);
        Ok(())
    }

    #[test]
    fn stepping_is_cyclic() -> Result<(), ThreadError> {
        let assignments = three_way();
        let start = permutation_index(&assignments, 0, A)?;
        let mut cursor = 0;
        let mut visited = Vec::new();
        for _ in 0..unique_permutations(&assignments, A) {
            cursor = next_permutation_cursor(&assignments, cursor, A)?.unwrap_or(cursor);
            visited.push(cursor);
        }
        assert_eq!(visited, vec![2, 4, 0]);
        assert_eq!(permutation_index(&assignments, cursor, A)?, start);
        Ok(())
    }

    #[test]
    fn single_slot_actor_has_no_next() -> Result<(), ThreadError> {
        let assignments = vec![vec![A, B, C], vec![A, C, B]];
        assert_eq!(next_permutation_cursor(&assignments, 0, A)?, None);
        assert_eq!(next_permutation_cursor(&assignments, 0, B)?, Some(1));
        Ok(())
    }

    #[test]
    fn missing_actor_is_inconsistent() {
        let assignments = vec![vec![A, B], vec![B, A], vec![B, C]];
        let err = permutation_index(&assignments, 2, A).unwrap_err();
        assert!(err.is_internal());
        assert!(next_permutation_cursor(&assignments, 2, A).is_err());
        assert!(permutation_index(&assignments, 3, A).is_err());
    }
}
