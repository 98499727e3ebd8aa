//! Per-entry solution bookkeeping.

use crate::cost::{CostVector, Criterion};

/// One candidate mapping with its accumulated cost.
#[derive(Clone, Debug)]
pub struct Solution<M> {
    /// The mapping choice.
    pub solution: M,
    /// Its accumulated cost vector.
    pub vector: CostVector,
}

/// The solutions kept per entry: the best overall under the (tension-
/// biased) criterion, plus the best bound-satisfying one.
#[derive(Clone, Debug)]
pub struct SolutionSpace<M> {
    best: Option<Solution<M>>,
    best_feasible: Option<Solution<M>>,
}

impl<M: Clone> SolutionSpace<M> {
    /// Creates an empty space.
    pub fn new() -> Self {
        Self {
            best: None,
            best_feasible: None,
        }
    }

    /// Offers a candidate; it is kept wherever it beats the incumbent.
    pub fn add(
        &mut self,
        solution: M,
        vector: CostVector,
        criterion: &Criterion,
        tension: &CostVector,
    ) {
        let candidate = Solution {
            solution,
            vector,
        };
        let beats = |incumbent: &Option<Solution<M>>| {
            incumbent
                .as_ref()
                .map_or(true, |inc| criterion.better(&vector, &inc.vector, tension))
        };
        if beats(&self.best) {
            self.best = Some(candidate.clone());
        }
        if criterion.check(&vector) && beats(&self.best_feasible) {
            self.best_feasible = Some(candidate);
        }
    }

    /// Returns `true` once any candidate was accepted.
    pub fn has_solution(&self) -> bool {
        self.best.is_some()
    }

    /// Returns `true` once a bound-satisfying candidate was accepted.
    pub fn has_feasible(&self) -> bool {
        self.best_feasible.is_some()
    }

    /// The best candidate overall.
    pub fn best(&self) -> Option<&Solution<M>> {
        self.best.as_ref()
    }

    /// The best bound-satisfying candidate, falling back to the best
    /// overall.
    pub fn preferred(&self) -> Option<&Solution<M>> {
        self.best_feasible.as_ref().or(self.best.as_ref())
    }
}

impl<M: Clone> Default for SolutionSpace<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_cheaper_candidate() {
        let criterion = Criterion::default();
        let mut space: SolutionSpace<&str> = SolutionSpace::new();
        space.add("big", CostVector::new(5.0, 1.0, 0.0), &criterion, &CostVector::ONES);
        space.add("small", CostVector::new(2.0, 1.0, 0.0), &criterion, &CostVector::ONES);
        space.add("huge", CostVector::new(9.0, 1.0, 0.0), &criterion, &CostVector::ONES);
        assert_eq!(space.best().unwrap().solution, "small");
    }

    #[test]
    fn feasible_tracked_separately() {
        let criterion = Criterion::with_bounds(CostVector::new(10.0, 3.0, f32::MAX));
        let mut space: SolutionSpace<&str> = SolutionSpace::new();
        // Cheaper but violates the delay bound.
        space.add("fastless", CostVector::new(1.0, 9.0, 0.0), &criterion, &CostVector::ONES);
        // Costlier but feasible.
        space.add("slowmore", CostVector::new(5.0, 2.0, 0.0), &criterion, &CostVector::ONES);
        assert_eq!(space.best().unwrap().solution, "fastless");
        assert_eq!(space.preferred().unwrap().solution, "slowmore");
        assert!(space.has_feasible());
    }

    #[test]
    fn preferred_falls_back_to_best() {
        let criterion = Criterion::with_bounds(CostVector::new(1.0, 1.0, 1.0));
        let mut space: SolutionSpace<&str> = SolutionSpace::new();
        space.add("only", CostVector::new(9.0, 9.0, 9.0), &criterion, &CostVector::ONES);
        assert!(!space.has_feasible());
        assert_eq!(space.preferred().unwrap().solution, "only");
    }

    #[test]
    fn empty_space() {
        let space: SolutionSpace<u32> = SolutionSpace::new();
        assert!(!space.has_solution());
        assert!(space.best().is_none());
        assert!(space.preferred().is_none());
    }
}
