use scene_formats::{ActorFragment, ObjectRef, PositionInfo, Scene};

/// One actor per scene position, indexed by slot.
pub type Assignment = Vec<ObjectRef>;

pub fn find_assignments(scene: &Scene, fragments: &[ActorFragment]) -> Vec<Assignment> {
    resolve_slots(&scene.positions, fragments)
}

/// Every bijection of `fragments` onto `slots` in which each actor satisfies
/// its slot. Slot 0 varies slowest and candidates are tried in input order,
/// so the result order is stable for a given actor order.
pub fn resolve_slots(slots: &[PositionInfo], fragments: &[ActorFragment]) -> Vec<Assignment> {
    if slots.is_empty() || slots.len() != fragments.len() {
        return Vec::new();
    }

    // fits[slot][actor]
    let fits: Vec<Vec<bool>> = slots
        .iter()
        .map(|slot| fragments.iter().map(|f| slot.can_fill(f)).collect())
        .collect();
    if fits.iter().any(|row| !row.contains(&true)) {
        return Vec::new();
    }

    let mut search = Search {
        fits: &fits,
        fragments,
        used: vec![false; fragments.len()],
        current: Vec::with_capacity(slots.len()),
        found: Vec::new(),
    };
    search.descend(0);
    search.found
}

struct Search<'a> {
    fits: &'a [Vec<bool>],
    fragments: &'a [ActorFragment],
    used: Vec<bool>,
    current: Assignment,
    found: Vec<Assignment>,
}

impl Search<'_> {
    fn descend(&mut self, slot: usize) {
        if slot == self.fits.len() {
            if !self.found.contains(&self.current) {
                self.found.push(self.current.clone());
            }
            return;
        }
        for actor in 0..self.fragments.len() {
            if self.used[actor] || !self.fits[slot][actor] {
                continue;
            }
            self.used[actor] = true;
            self.current.push(self.fragments[actor].actor);
            self.descend(slot + 1);
            self.current.pop();
            self.used[actor] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_formats::{PositionTag, Sex};

    fn slot(sexes: &[Sex]) -> PositionInfo {
        PositionInfo {
            sexes: sexes.to_vec(),
            ..PositionInfo::default()
        }
    }

    fn actor(id: u32, sex: Sex) -> ActorFragment {
        ActorFragment::new(ObjectRef(id), sex, "human")
    }

    #[test]
    fn female_slot_pins_the_only_female() {
        let slots = [slot(&[Sex::Female]), slot(&[])];
        let actors = [actor(1, Sex::Female), actor(2, Sex::Male)];
        let found = resolve_slots(&slots, &actors);
        assert_eq!(found, vec![vec![ObjectRef(1), ObjectRef(2)]]);
    }

    #[test]
    fn open_slots_admit_both_orders() {
        let slots = [slot(&[]), slot(&[])];
        let actors = [actor(1, Sex::Female), actor(2, Sex::Male)];
        let found = resolve_slots(&slots, &actors);
        assert_eq!(
            found,
            vec![
                vec![ObjectRef(1), ObjectRef(2)],
                vec![ObjectRef(2), ObjectRef(1)]
            ]
        );
    }

    #[test]
    fn count_mismatch_is_empty() {
        let slots = [slot(&[]), slot(&[])];
        assert!(resolve_slots(&slots, &[actor(1, Sex::Male)]).is_empty());
        assert!(resolve_slots(&[], &[]).is_empty());
    }

    #[test]
    fn unfillable_slot_is_empty() {
        let slots = [slot(&[Sex::Female]), slot(&[Sex::Female])];
        let actors = [actor(1, Sex::Female), actor(2, Sex::Male)];
        assert!(resolve_slots(&slots, &actors).is_empty());
    }

    #[test]
    fn repeated_actor_tuples_are_reported_once() {
        let slots = [slot(&[]), slot(&[])];
        let actors = [actor(7, Sex::Male), actor(7, Sex::Male)];
        assert_eq!(
            resolve_slots(&slots, &actors),
            vec![vec![ObjectRef(7), ObjectRef(7)]]
        );
    }

    #[test]
    fn submissive_actor_only_takes_submissive_slot() {
        let mut victim = slot(&[]);
        victim.tags.insert(PositionTag::Submissive);
        let slots = [slot(&[]), victim, slot(&[])];
        let actors = [
            actor(1, Sex::Female).with_tag(PositionTag::Submissive),
            actor(2, Sex::Male),
            actor(3, Sex::Male),
        ];
        let found = resolve_slots(&slots, &actors);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|a| a[1] == ObjectRef(1)));
    }

    /// Compare against a brute-force walk over every permutation.
    #[test]
    fn matches_exhaustive_enumeration() {
        let sexes = [Sex::Male, Sex::Female, Sex::Futa];
        let slots = [
            slot(&[Sex::Female, Sex::Futa]),
            slot(&[]),
            slot(&[Sex::Male, Sex::Futa]),
            slot(&[]),
        ];
        for mask in 0..81u32 {
            let actors: Vec<ActorFragment> = (0..4)
                .map(|i| actor(i + 1, sexes[((mask / 3u32.pow(i)) % 3) as usize]))
                .collect();
            let found = resolve_slots(&slots, &actors);

            let mut expected = Vec::new();
            for perm in permutations(4) {
                let ok = perm
                    .iter()
                    .enumerate()
                    .all(|(slot_idx, &actor_idx)| slots[slot_idx].can_fill(&actors[actor_idx]));
                if ok {
                    expected.push(perm.iter().map(|&i| actors[i].actor).collect::<Assignment>());
                }
            }
            assert_eq!(found.len(), expected.len(), "mask {mask}");
            for assignment in &expected {
                assert!(found.contains(assignment), "mask {mask} missing {assignment:?}");
            }
        }
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for perm in permutations(n - 1) {
            for pos in 0..=perm.len() {
                let mut next = perm.clone();
                next.insert(pos, n - 1);
                out.push(next);
            }
        }
        out
    }
}
