//! Per-node best-list and its update/selection policies.
//!
//! The best-list is a small bounded set of top solutions. Update policies
//! decide which slot an improving solution overwrites; the selection policy
//! picks the solution gossiped to children.

use rand::RngCore;

use crate::error::{Result, TesoroError};
use crate::search::FitnessPolicy;
use crate::solution::Solution;

/// Bounded set of top solutions. Slots start empty.
#[derive(Debug, Clone)]
pub struct BestList {
    slots: Vec<Option<Solution>>,
}

impl BestList {
    /// Create an empty best-list with the given capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TesoroError::InvalidParameter {
                name: "best_list_capacity",
                value: 0.0,
            });
        }
        Ok(Self {
            slots: vec![None; capacity],
        })
    }

    /// Capacity of the list.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Solution at `index`, if the slot is filled.
    pub fn get(&self, index: usize) -> Result<Option<&Solution>> {
        self.slots
            .get(index)
            .map(Option::as_ref)
            .ok_or(TesoroError::InvalidIndex {
                index,
                len: self.slots.len(),
            })
    }

    /// Store a solution at `index`, replacing any previous occupant.
    pub fn set(&mut self, index: usize, solution: Solution) -> Result<()> {
        if index >= self.slots.len() {
            return Err(TesoroError::InvalidIndex {
                index,
                len: self.slots.len(),
            });
        }
        self.slots[index] = Some(solution);
        Ok(())
    }

    /// Whether every slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Iterate over the filled slots.
    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    fn slots(&self) -> &[Option<Solution>] {
        &self.slots
    }
}

/// Squared Euclidean distance between two solutions, summing each
/// dimension's internal values before squaring.
fn squared_distance(first: &Solution, second: &Solution) -> Result<f64> {
    if first.n_dims() != second.n_dims() {
        return Err(TesoroError::ShapeMismatch {
            expected: first.n_dims(),
            got: second.n_dims(),
        });
    }
    let mut dist = 0.0;
    for i in 0..first.n_dims() {
        let mut diff = second.position(i).clone();
        diff.sub(first.position(i))?;
        let d = diff.sum();
        dist += d * d;
    }
    Ok(dist)
}

/// Replacement policy applied when a new solution reaches the best-list.
pub trait BestListUpdate: Send {
    /// Fold `solution` into `list`, first filling an empty slot, otherwise
    /// replacing one of the slots the solution improves upon.
    fn apply(
        &self,
        list: &mut BestList,
        solution: &Solution,
        fitness: &dyn FitnessPolicy,
    ) -> Result<()>;
}

/// Convergent update: replace the improved slot *farthest* from the new
/// solution, shrinking the diversity of the list so the node converges and
/// communicates sooner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergentUpdate;

impl BestListUpdate for ConvergentUpdate {
    fn apply(
        &self,
        list: &mut BestList,
        solution: &Solution,
        fitness: &dyn FitnessPolicy,
    ) -> Result<()> {
        let mut target = None;
        let mut largest = -1.0f64;
        for (i, slot) in list.slots().iter().enumerate() {
            match slot {
                None => {
                    target = Some(i);
                    break;
                }
                Some(stored) if fitness.better(solution, stored) => {
                    let distance = squared_distance(solution, stored)?;
                    if distance > largest {
                        largest = distance;
                        target = Some(i);
                    }
                }
                Some(_) => {}
            }
        }
        if let Some(i) = target {
            list.set(i, solution.clone())?;
        }
        Ok(())
    }
}

/// Divergent update: replace the improved slot *nearest* to the new
/// solution, preserving diversity across the list.
#[derive(Debug, Clone, Copy, Default)]
pub struct DivergentUpdate;

impl BestListUpdate for DivergentUpdate {
    fn apply(
        &self,
        list: &mut BestList,
        solution: &Solution,
        fitness: &dyn FitnessPolicy,
    ) -> Result<()> {
        let mut target = None;
        let mut smallest = f64::MAX;
        for (i, slot) in list.slots().iter().enumerate() {
            match slot {
                None => {
                    target = Some(i);
                    break;
                }
                Some(stored) if fitness.better(solution, stored) => {
                    let distance = squared_distance(solution, stored)?;
                    if distance < smallest {
                        smallest = distance;
                        target = Some(i);
                    }
                }
                Some(_) => {}
            }
        }
        if let Some(i) = target {
            list.set(i, solution.clone())?;
        }
        Ok(())
    }
}

/// Policy picking the solution gossiped to children.
pub trait BestListSelection: Send {
    /// Select one stored solution. Fails only when the list is empty.
    fn apply(
        &self,
        list: &BestList,
        fitness: &dyn FitnessPolicy,
        rng: &mut dyn RngCore,
    ) -> Result<Solution>;
}

/// Uniformly random slot; an empty draw falls forward to the first filled
/// slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelection;

impl BestListSelection for RandomSelection {
    fn apply(
        &self,
        list: &BestList,
        _fitness: &dyn FitnessPolicy,
        rng: &mut dyn RngCore,
    ) -> Result<Solution> {
        use rand::Rng;
        let pos = rng.random_range(0..list.capacity());
        if let Some(solution) = list.get(pos)? {
            return Ok(solution.clone());
        }
        for i in 0..list.capacity() {
            if let Some(solution) = list.get(i)? {
                return Ok(solution.clone());
            }
        }
        Err(TesoroError::EmptyBestList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::Sphere;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn solution_at(coords: &[f64], fitness: f64) -> Solution {
        let mut s = Solution::new(coords.len());
        for (i, &c) in coords.iter().enumerate() {
            s.position_mut(i).fill(c);
        }
        s.fitness_mut().fill(fitness);
        s
    }

    #[test]
    fn test_empty_slots_fill_first() {
        let mut list = BestList::new(2).unwrap();
        let policy = ConvergentUpdate;
        policy
            .apply(&mut list, &solution_at(&[0.0, 0.0], 10.0), &Sphere)
            .unwrap();
        policy
            .apply(&mut list, &solution_at(&[5.0, 5.0], 5.0), &Sphere)
            .unwrap();
        assert_eq!(list.get(0).unwrap().unwrap().fitness().first(), 10.0);
        assert_eq!(list.get(1).unwrap().unwrap().fitness().first(), 5.0);
    }

    #[test]
    fn test_convergent_replaces_farthest_improved_slot() {
        let mut list = BestList::new(2).unwrap();
        let policy = ConvergentUpdate;
        policy
            .apply(&mut list, &solution_at(&[0.0, 0.0], 10.0), &Sphere)
            .unwrap();
        policy
            .apply(&mut list, &solution_at(&[5.0, 5.0], 5.0), &Sphere)
            .unwrap();
        // Beats both stored solutions; (0, 0) is the farther one.
        policy
            .apply(&mut list, &solution_at(&[4.0, 4.0], 4.0), &Sphere)
            .unwrap();
        assert_eq!(list.get(0).unwrap().unwrap().fitness().first(), 4.0);
        assert_eq!(list.get(1).unwrap().unwrap().fitness().first(), 5.0);
    }

    #[test]
    fn test_divergent_replaces_nearest_improved_slot() {
        let mut list = BestList::new(2).unwrap();
        let policy = DivergentUpdate;
        policy
            .apply(&mut list, &solution_at(&[0.0, 0.0], 10.0), &Sphere)
            .unwrap();
        policy
            .apply(&mut list, &solution_at(&[5.0, 5.0], 5.0), &Sphere)
            .unwrap();
        policy
            .apply(&mut list, &solution_at(&[4.0, 4.0], 4.0), &Sphere)
            .unwrap();
        assert_eq!(list.get(0).unwrap().unwrap().fitness().first(), 10.0);
        assert_eq!(list.get(1).unwrap().unwrap().fitness().first(), 4.0);
    }

    #[test]
    fn test_no_improvement_leaves_list_untouched() {
        let mut list = BestList::new(1).unwrap();
        let policy = ConvergentUpdate;
        policy
            .apply(&mut list, &solution_at(&[1.0], 1.0), &Sphere)
            .unwrap();
        policy
            .apply(&mut list, &solution_at(&[2.0], 2.0), &Sphere)
            .unwrap();
        assert_eq!(list.get(0).unwrap().unwrap().fitness().first(), 1.0);
    }

    #[test]
    fn test_min_fitness_never_degrades_under_convergent_updates() {
        let mut list = BestList::new(3).unwrap();
        let policy = ConvergentUpdate;
        let mut best_so_far = f64::MAX;
        let inputs = [9.0, 7.0, 8.0, 3.0, 12.0, 2.0, 6.0];
        for (i, &fit) in inputs.iter().enumerate() {
            policy
                .apply(&mut list, &solution_at(&[i as f64, fit], fit), &Sphere)
                .unwrap();
            let current_min = list
                .iter()
                .map(|s| s.fitness().first())
                .fold(f64::MAX, f64::min);
            assert!(current_min <= best_so_far.min(fit));
            best_so_far = best_so_far.min(current_min);
        }
    }

    #[test]
    fn test_random_selection_scans_forward_from_empty_slot() {
        let mut list = BestList::new(4).unwrap();
        list.set(2, solution_at(&[1.0], 1.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let picked = RandomSelection.apply(&list, &Sphere, &mut rng).unwrap();
            assert_eq!(picked.fitness().first(), 1.0);
        }
    }

    #[test]
    fn test_selection_from_empty_list_fails() {
        let list = BestList::new(2).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            RandomSelection.apply(&list, &Sphere, &mut rng),
            Err(TesoroError::EmptyBestList)
        ));
    }
}
