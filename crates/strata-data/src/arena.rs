// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bounded, generational slot allocator.

/// A slot index paired with the generation it was allocated in.
///
/// Releasing a slot bumps its generation on the next allocation, so an id
/// kept after release no longer matches the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    /// Index of the slot.
    pub index: u32,
    /// Generation of the slot when this id was handed out.
    pub generation: u32,
}

/// Allocates slot indices from a fixed-capacity range, recycling released
/// indices through a free list.
#[derive(Debug, Clone)]
pub struct SlotArena {
    /// Current generation of every slot created so far.
    generations: Vec<u32>,
    /// Whether each slot is currently allocated.
    live: Vec<bool>,
    /// Released indices, reused most-recent first.
    free: Vec<u32>,
    capacity: usize,
    live_count: usize,
}

impl SlotArena {
    /// Creates an arena that never hands out more than `capacity` live slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            free: Vec::new(),
            capacity,
            live_count: 0,
        }
    }

    /// Allocates a slot, or returns `None` if every slot is live.
    pub fn allocate(&mut self) -> Option<SlotId> {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.generations[slot] = self.generations[slot].wrapping_add(1);
            self.live[slot] = true;
            self.live_count += 1;
            return Some(SlotId {
                index,
                generation: self.generations[slot],
            });
        }

        if self.generations.len() >= self.capacity {
            return None;
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.live.push(true);
        self.live_count += 1;
        Some(SlotId {
            index,
            generation: 0,
        })
    }

    /// Releases a live slot. Returns `false` for stale or unknown ids.
    pub fn release(&mut self, id: SlotId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.live[id.index as usize] = false;
        self.free.push(id.index);
        self.live_count -= 1;
        true
    }

    /// Returns `true` if `id` refers to the current allocation of a live slot.
    pub fn is_live(&self, id: SlotId) -> bool {
        let slot = id.index as usize;
        self.live.get(slot).copied().unwrap_or(false) && self.generations[slot] == id.generation
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Maximum number of live slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_stops_at_capacity() {
        let mut arena = SlotArena::with_capacity(3);
        let ids: Vec<_> = (0..3).map(|_| arena.allocate().unwrap()).collect();
        assert_eq!(ids.iter().map(|id| id.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(arena.allocate().is_none());
        assert_eq!(arena.live_count(), 3);
    }

    #[test]
    fn test_released_slot_is_reused_with_new_generation() {
        let mut arena = SlotArena::with_capacity(2);
        let a = arena.allocate().unwrap();
        let _b = arena.allocate().unwrap();

        assert!(arena.release(a));
        let c = arena.allocate().unwrap();
        assert_eq!(c.index, a.index);
        assert_eq!(c.generation, a.generation + 1);

        // The stale id no longer matches.
        assert!(!arena.is_live(a));
        assert!(!arena.release(a));
        assert!(arena.is_live(c));
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        let mut arena = SlotArena::with_capacity(4);
        let bogus = SlotId {
            index: 3,
            generation: 0,
        };
        assert!(!arena.is_live(bogus));
        assert!(!arena.release(bogus));
    }
}
