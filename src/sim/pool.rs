//! Fixed-capacity entity pools
//!
//! Each entity kind gets one pool, filled to capacity when the world is built.
//! Instances move between an inactive free list and an ordered active list;
//! instances are never allocated or dropped once the pool is built.
//!
//! Removal comes in two flavours:
//! - `kill_instance` removes immediately. It needs `&mut self`, so it cannot
//!   be reached while the pool is iterating its own active list.
//! - `kill_instance_safe` (or `Life::kill_safe` from inside `update`) marks the
//!   instance a zombie; `flush_zombies` reclaims it once iteration is done.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{SimError, SimResult};

/// A pooled entity kind
pub trait Pooled: Default {
    /// Kind name used in logs and errors
    const KIND: &'static str;
    /// Everything `spawn` needs to bring an instance to life
    type Args;

    /// Re-initialize every field for a new life
    ///
    /// Implementations assign a complete struct literal so no field can keep a
    /// value from a previous life.
    fn reset(&mut self, args: Self::Args);

    /// Null every field; called exactly once per life, on removal
    ///
    /// Dropping the instance's script here is what cancels it.
    fn clean_instance(&mut self) {
        *self = Self::default();
    }
}

/// A pooled kind that is simulated once per tick with context `C`
pub trait Updatable<C>: Pooled {
    fn update(&mut self, life: &mut Life, delta: f32, ctx: &mut C) -> SimResult<()>;

    /// Per-pool tick. Kinds with pool-level invariants (tiling, sorting)
    /// override this; the default updates every live instance in activation
    /// order and then reclaims zombies.
    fn update_class(pool: &mut EntityPool<Self>, delta: f32, ctx: &mut C) -> SimResult<()> {
        pool.update_live(delta, ctx)?;
        pool.flush_zombies();
        Ok(())
    }
}

/// Per-life state an entity may touch during its own update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Life {
    zombie: bool,
}

impl Life {
    /// Mark for removal at the end of the current iteration
    ///
    /// Returns false if already marked.
    pub fn kill_safe(&mut self) -> bool {
        !std::mem::replace(&mut self.zombie, true)
    }

    pub fn is_zombie(&self) -> bool {
        self.zombie
    }
}

/// Stable identity of one life of one pooled instance
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
            _kind: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    entity: T,
    /// Bumped on every removal so handles from earlier lives go stale
    generation: u32,
    active: bool,
    life: Life,
}

/// Fixed-capacity pool of one entity kind
pub struct EntityPool<T> {
    slots: Vec<Slot<T>>,
    /// Active slot indices in activation order (unless re-sorted)
    active: Vec<usize>,
    /// Recycled slot indices
    inactive: Vec<usize>,
}

impl<T: Pooled> EntityPool<T> {
    /// Pre-populate `capacity` blank instances
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                entity: T::default(),
                generation: 0,
                active: false,
                life: Life::default(),
            })
            .collect();
        // Reversed so spawns pop the lowest slot first
        let inactive = (0..capacity).rev().collect();
        Self {
            slots,
            active: Vec::with_capacity(capacity),
            inactive,
        }
    }

    pub fn kind(&self) -> &'static str {
        T::KIND
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Active instances, zombies included
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn inactive_len(&self) -> usize {
        self.inactive.len()
    }

    /// Active instances not marked for removal
    pub fn live_len(&self) -> usize {
        self.active
            .iter()
            .filter(|&&index| !self.slots[index].life.zombie)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Activate a recycled instance
    pub fn spawn(&mut self, args: T::Args) -> SimResult<Handle<T>> {
        let Some(index) = self.inactive.pop() else {
            log::error!("{} pool exhausted ({} active)", T::KIND, self.active.len());
            return Err(SimError::PoolExhausted {
                kind: T::KIND,
                capacity: self.capacity(),
            });
        };
        let slot = &mut self.slots[index];
        slot.entity.reset(args);
        slot.active = true;
        slot.life = Life::default();
        self.active.push(index);
        log::trace!("spawned {} #{}", T::KIND, index);
        Ok(Handle::new(index, slot.generation))
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.active && slot.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: Handle<T>) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.active && slot.generation == handle.generation)
    }

    /// The instance behind `handle`, if that life is still active
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slot(handle).map(|slot| &slot.entity)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slot_mut(handle).map(|slot| &mut slot.entity)
    }

    pub fn is_zombie(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some_and(|slot| slot.life.zombie)
    }

    /// Active and not marked for removal
    pub fn is_alive(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some_and(|slot| !slot.life.zombie)
    }

    /// Mark for deferred removal; safe during any iteration
    ///
    /// Returns false for zombies, stale handles and inactive slots.
    pub fn kill_instance_safe(&mut self, handle: Handle<T>) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => slot.life.kill_safe(),
            None => false,
        }
    }

    /// Remove immediately
    ///
    /// A zombie is left for `flush_zombies` so that it is cleaned exactly once.
    pub fn kill_instance(&mut self, handle: Handle<T>) -> bool {
        match self.slot(handle) {
            Some(slot) if !slot.life.zombie => {}
            _ => return false,
        }
        if let Some(position) = self.active.iter().position(|&i| i == handle.index()) {
            self.active.remove(position);
        }
        self.release(handle.index());
        true
    }

    /// Clean a slot and return it to the free list
    fn release(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.entity.clean_instance();
        slot.active = false;
        slot.life = Life::default();
        slot.generation = slot.generation.wrapping_add(1);
        self.inactive.push(index);
        log::trace!("released {} #{}", T::KIND, index);
    }

    /// Reclaim every zombie, preserving the order of the survivors
    pub fn flush_zombies(&mut self) -> usize {
        let mut reclaimed = Vec::new();
        let slots = &self.slots;
        self.active.retain(|&index| {
            let zombie = slots[index].life.zombie;
            if zombie {
                reclaimed.push(index);
            }
            !zombie
        });
        for &index in &reclaimed {
            self.release(index);
        }
        reclaimed.len()
    }

    /// Reclaim every active instance (session teardown)
    pub fn kill_all(&mut self) {
        for index in std::mem::take(&mut self.active) {
            self.release(index);
        }
    }

    /// Active instances in activation order, zombies included
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.active.iter().map(|&index| {
            let slot = &self.slots[index];
            (Handle::new(index, slot.generation), &slot.entity)
        })
    }

    /// Active instances that are not zombies
    pub fn iter_live(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.active
            .iter()
            .filter(|&&index| !self.slots[index].life.zombie)
            .map(|&index| {
                let slot = &self.slots[index];
                (Handle::new(index, slot.generation), &slot.entity)
            })
    }

    /// First live instance in activation order
    pub fn first_live(&self) -> Option<(Handle<T>, &T)> {
        self.iter_live().next()
    }

    /// Snapshot of active handles, for passes that mutate while walking
    pub fn active_handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Re-order the active list (stable)
    pub fn sort_active_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        let slots = &self.slots;
        self.active
            .sort_by(|&a, &b| compare(&slots[a].entity, &slots[b].entity));
    }

    /// Call `update` on every live instance in active-list order
    ///
    /// Zombies are skipped: nothing is ever resumed against an instance that is
    /// already marked for removal.
    pub fn update_live<C>(&mut self, delta: f32, ctx: &mut C) -> SimResult<()>
    where
        T: Updatable<C>,
    {
        for i in 0..self.active.len() {
            let slot = &mut self.slots[self.active[i]];
            if slot.life.zombie {
                continue;
            }
            slot.entity.update(&mut slot.life, delta, ctx)?;
        }
        Ok(())
    }

    /// Run this kind's per-pool tick
    pub fn update_class<C>(&mut self, delta: f32, ctx: &mut C) -> SimResult<()>
    where
        T: Updatable<C>,
    {
        T::update_class(self, delta, ctx)
    }
}

impl<T> fmt::Debug for EntityPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPool")
            .field("active", &self.active.len())
            .field("inactive", &self.inactive.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts `clean_instance` calls through a shared cell
    #[derive(Default)]
    struct Marker {
        id: u32,
        cleans: Option<Rc<Cell<u32>>>,
    }

    impl Pooled for Marker {
        const KIND: &'static str = "marker";
        type Args = (u32, Rc<Cell<u32>>);

        fn reset(&mut self, (id, cleans): Self::Args) {
            *self = Self {
                id,
                cleans: Some(cleans),
            };
        }

        fn clean_instance(&mut self) {
            if let Some(cleans) = &self.cleans {
                cleans.set(cleans.get() + 1);
            }
            *self = Self::default();
        }
    }

    /// Context for update tests: ids visited, and which id kills itself
    struct Visit {
        seen: Vec<u32>,
        kill: u32,
    }

    impl Updatable<Visit> for Marker {
        fn update(&mut self, life: &mut Life, _delta: f32, ctx: &mut Visit) -> SimResult<()> {
            ctx.seen.push(self.id);
            if self.id == ctx.kill {
                life.kill_safe();
            }
            Ok(())
        }
    }

    fn conserved(pool: &EntityPool<Marker>) -> bool {
        pool.active_len() + pool.inactive_len() == pool.capacity()
    }

    #[test]
    fn test_spawn_until_exhausted() {
        let cleans = Rc::new(Cell::new(0));
        let mut pool = EntityPool::<Marker>::new(3);
        for id in 0..3 {
            pool.spawn((id, cleans.clone())).expect("capacity left");
        }
        let err = pool.spawn((3, cleans.clone())).unwrap_err();
        assert!(matches!(
            err,
            SimError::PoolExhausted {
                kind: "marker",
                capacity: 3
            }
        ));
        assert_eq!(pool.active_len(), 3);
        assert!(conserved(&pool));
    }

    #[test]
    fn test_safe_kill_during_iteration() {
        let cleans = Rc::new(Cell::new(0));
        let mut pool = EntityPool::<Marker>::new(3);
        for id in 0..3 {
            pool.spawn((id, cleans.clone())).expect("capacity left");
        }
        let mut ctx = Visit {
            seen: Vec::new(),
            kill: 1,
        };
        pool.update_class(0.0, &mut ctx).expect("tick");
        assert_eq!(ctx.seen, vec![0, 1, 2]);
        assert_eq!(pool.active_len(), 2);
        assert_eq!(pool.inactive_len(), 1);
        assert_eq!(cleans.get(), 1);
        let ids: Vec<u32> = pool.iter().map(|(_, m)| m.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_zombies_are_not_updated() {
        let cleans = Rc::new(Cell::new(0));
        let mut pool = EntityPool::<Marker>::new(3);
        let a = pool.spawn((0, cleans.clone())).expect("spawn");
        pool.spawn((1, cleans.clone())).expect("spawn");
        pool.kill_instance_safe(a);
        let mut ctx = Visit {
            seen: Vec::new(),
            kill: u32::MAX,
        };
        pool.update_live(0.0, &mut ctx).expect("tick");
        assert_eq!(ctx.seen, vec![1]);
    }

    #[test]
    fn test_double_safe_kill_cleans_once() {
        let cleans = Rc::new(Cell::new(0));
        let mut pool = EntityPool::<Marker>::new(2);
        let handle = pool.spawn((7, cleans.clone())).expect("spawn");
        assert!(pool.kill_instance_safe(handle));
        assert!(!pool.kill_instance_safe(handle));
        assert!(!pool.kill_instance(handle));
        assert!(pool.is_zombie(handle));
        assert_eq!(pool.flush_zombies(), 1);
        assert_eq!(pool.flush_zombies(), 0);
        assert_eq!(cleans.get(), 1);
        assert_eq!(pool.inactive_len(), 2);
        assert!(conserved(&pool));
    }

    #[test]
    fn test_stale_handle_does_not_alias_next_life() {
        let cleans = Rc::new(Cell::new(0));
        let mut pool = EntityPool::<Marker>::new(1);
        let first = pool.spawn((1, cleans.clone())).expect("spawn");
        assert!(pool.kill_instance(first));
        let second = pool.spawn((2, cleans.clone())).expect("spawn");
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(pool.get(first).is_none());
        assert!(!pool.kill_instance_safe(first));
        assert_eq!(pool.get(second).map(|m| m.id), Some(2));
    }

    #[test]
    fn test_clean_nulls_fields() {
        let cleans = Rc::new(Cell::new(0));
        let mut pool = EntityPool::<Marker>::new(1);
        let handle = pool.spawn((9, cleans.clone())).expect("spawn");
        pool.kill_instance(handle);
        // Only strong refs left are ours: the slot dropped its clone
        assert_eq!(Rc::strong_count(&cleans), 1);
    }

    #[test]
    fn test_sort_and_kill_all() {
        let cleans = Rc::new(Cell::new(0));
        let mut pool = EntityPool::<Marker>::new(4);
        for id in [3, 1, 2] {
            pool.spawn((id, cleans.clone())).expect("spawn");
        }
        pool.sort_active_by(|a, b| a.id.cmp(&b.id));
        let ids: Vec<u32> = pool.iter().map(|(_, m)| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        pool.kill_all();
        assert!(pool.is_empty());
        assert_eq!(cleans.get(), 3);
        assert!(conserved(&pool));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Spawn,
        Kill(usize),
        KillSafe(usize),
        Flush,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Spawn),
            (0usize..16).prop_map(Op::Kill),
            (0usize..16).prop_map(Op::KillSafe),
            Just(Op::Flush),
        ]
    }

    proptest! {
        #[test]
        fn prop_pool_conservation(capacity in 1usize..8, ops in prop::collection::vec(op(), 0..64)) {
            let cleans = Rc::new(Cell::new(0));
            let mut pool = EntityPool::<Marker>::new(capacity);
            let mut handles: Vec<Handle<Marker>> = Vec::new();
            let mut removed = 0u32;
            for op in ops {
                match op {
                    Op::Spawn => {
                        let had_room = pool.inactive_len() > 0;
                        match pool.spawn((0, cleans.clone())) {
                            Ok(handle) => {
                                prop_assert!(had_room);
                                handles.push(handle);
                            }
                            Err(_) => prop_assert!(!had_room),
                        }
                    }
                    Op::Kill(i) => {
                        if let Some(&handle) = handles.get(i) {
                            if pool.kill_instance(handle) {
                                removed += 1;
                            }
                        }
                    }
                    Op::KillSafe(i) => {
                        if let Some(&handle) = handles.get(i) {
                            pool.kill_instance_safe(handle);
                        }
                    }
                    Op::Flush => removed += pool.flush_zombies() as u32,
                }
                prop_assert!(conserved(&pool));
                prop_assert_eq!(cleans.get(), removed);
            }
        }
    }
}
