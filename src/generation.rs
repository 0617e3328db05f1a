/// Fixed ring of snapshot generations.
///
/// Roles are indices into `slots`: `head` is the current generation, `head - 1` the previous one and so
/// on. Rotation never moves data, it only advances `head`, so the oldest generation becomes the new
/// current one and is overwritten by the next capture.
#[derive(Debug, Clone)]
pub struct GenerationRing<G, const N: usize> {
    slots: [G; N],
    head: usize,
    rollovers: u64,
    rollover_pending: bool,
}

impl<G, const N: usize> GenerationRing<G, N> {
    pub fn new(slots: [G; N]) -> Self {
        assert!(N >= 2, "a generation ring needs at least two generations");
        Self { slots, head: 0, rollovers: 0, rollover_pending: false }
    }

    pub fn from_fn(f: impl FnMut(usize) -> G) -> Self {
        Self::new(std::array::from_fn(f))
    }

    fn index_back(&self, age: usize) -> usize {
        assert!(age < N, "generation age {age} outside ring of {N}");
        (self.head + N - age) % N
    }

    pub fn current(&self) -> &G {
        &self.slots[self.head]
    }

    pub fn current_mut(&mut self) -> &mut G {
        &mut self.slots[self.head]
    }

    pub fn previous(&self) -> &G {
        self.back(1)
    }

    /// Generation captured `age` rollovers ago; `back(0)` is the current one.
    pub fn back(&self, age: usize) -> &G {
        &self.slots[self.index_back(age)]
    }

    /// Mutable current generation alongside the read-only previous one.
    pub fn current_and_previous_mut(&mut self) -> (&mut G, &G) {
        let current = self.head;
        let previous = self.index_back(1);
        if current < previous {
            let (low, high) = self.slots.split_at_mut(previous);
            (&mut low[current], &high[0])
        } else {
            let (low, high) = self.slots.split_at_mut(current);
            (&mut high[0], &low[previous])
        }
    }

    pub fn rotate(&mut self) {
        self.head = (self.head + 1) % N;
        self.rollovers += 1;
    }

    pub fn rollovers(&self) -> u64 {
        self.rollovers
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn mark_rollover(&mut self) {
        self.rollover_pending = true;
    }

    pub fn rollover_pending(&self) -> bool {
        self.rollover_pending
    }

    /// Rotates when a rollover was pending and reports whether it did.
    pub fn take_rollover(&mut self) -> bool {
        if !self.rollover_pending {
            return false;
        }
        self.rollover_pending = false;
        self.rotate();
        true
    }

    pub fn reset(&mut self, mut clear: impl FnMut(&mut G)) {
        for slot in self.slots.iter_mut() {
            clear(slot);
        }
        self.head = 0;
        self.rollovers = 0;
        self.rollover_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_generation_roles_follow_rollover_parity() {
        let mut ring = GenerationRing::new([10, 20]);
        for n in 0..7u64 {
            assert_eq!(ring.rollovers(), n);
            assert_eq!(ring.head(), (n % 2) as usize);
            assert_ne!(*ring.current(), *ring.previous());
            ring.rotate();
        }
    }

    #[test]
    fn rotation_reuses_the_oldest_generation() {
        let mut ring = GenerationRing::<u32, 3>::from_fn(|i| i as u32);
        assert_eq!((*ring.current(), *ring.previous(), *ring.back(2)), (0, 2, 1));
        ring.rotate();
        *ring.current_mut() = 7;
        assert_eq!((*ring.current(), *ring.previous(), *ring.back(2)), (7, 0, 2));
    }

    #[test]
    fn split_borrow_returns_distinct_generations() {
        let mut ring = GenerationRing::new([1, 2]);
        for _ in 0..3 {
            let (current, previous) = ring.current_and_previous_mut();
            *current = *previous + 1;
            let expected = *current;
            assert_eq!(*ring.current(), expected);
            ring.rotate();
        }
    }

    #[test]
    fn rollover_is_lazy() {
        let mut ring = GenerationRing::new([0u8, 0u8]);
        assert!(!ring.take_rollover());
        ring.mark_rollover();
        ring.mark_rollover();
        assert!(ring.rollover_pending());
        assert!(ring.take_rollover());
        assert!(!ring.take_rollover());
        assert_eq!(ring.rollovers(), 1);
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut ring = GenerationRing::new([3, 4, 5]);
        ring.rotate();
        ring.mark_rollover();
        ring.reset(|slot| *slot = 0);
        assert_eq!(ring.head(), 0);
        assert!(!ring.rollover_pending());
        assert_eq!(*ring.current() + *ring.previous() + *ring.back(2), 0);
    }
}
