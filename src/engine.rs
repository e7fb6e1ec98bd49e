//! The displacement engine: opens buckets within a neighborhood and
//! rebuilds the probe structures at a new capacity.
//!
//! `free_up` opens a bucket within a home's neighborhood by cascading
//! displacements backwards from the nearest free slot. `resize`
//! rebuilds the probe structures (not the data vectors) at a new
//! capacity, replaying every entry in insertion order. The
//! backward-shift probing loop follows the same shape as an
//! open-addressed hash table's deletion routine, adapted here from
//! linear probing to bounded hopscotch neighborhoods.

use crate::error::{HopscotchError, NoSpace};
use crate::neighborhood::{Nbhds, ALLOWED_WIDTHS};
use crate::slots::Slots;

/// Maximum load factor; reaching it after an insert triggers growth.
pub(crate) const MAX_DENSITY: f64 = 0.8;

/// Capacity and neighborhood width a freshly cleared table starts at.
pub(crate) const INITIAL_SIZE: usize = 8;
pub(crate) const INITIAL_WIDTH: u32 = 8;

/// The probe structures: slot array plus neighborhood bitmap at a
/// given capacity. Owns no key, value, or hash data (those stay in the
/// data vectors in `HopscotchMap` and are passed in by reference
/// wherever the engine needs to recover an entry's home bucket).
#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub(crate) slots: Slots,
    pub(crate) nbhds: Nbhds,
    pub(crate) size: usize,
}

impl Table {
    pub(crate) fn new(size: usize, width: u32) -> Self {
        Table {
            slots: Slots::new(size),
            nbhds: Nbhds::new(width, size),
            size,
        }
    }

    pub(crate) fn nbhd_width(&self) -> u32 {
        self.nbhds.width()
    }

    /// Opens bucket `idx` by cascading displacements backwards from
    /// the nearest free slot.
    ///
    /// If `idx` is already free, this is a no-op. On success, `idx`
    /// is free and every neighborhood invariant holds. On failure,
    /// returns `NoSpace` with the table left unchanged; the caller is
    /// expected to grow the table and retry.
    pub(crate) fn free_up(&mut self, idx: usize, hashes: &[u64]) -> Result<(), NoSpace> {
        if self.slots.is_free(idx) {
            return Ok(());
        }

        let width = self.nbhd_width() as usize;
        let mut act_idx = idx;

        loop {
            if act_idx >= self.size {
                return Err(NoSpace);
            }

            if !self.slots.is_free(act_idx) {
                act_idx += 1;
                continue;
            }

            if act_idx - idx < width {
                // Near case: the entry at idx can hop directly to act_idx.
                let entry = self
                    .slots
                    .get(idx)
                    .expect("idx holds an entry by loop construction");
                let home = (hashes[entry] as usize) % self.size;

                self.slots.set(act_idx, entry);
                self.nbhds
                    .set(home, (act_idx - home) as u32)
                    .expect("act_idx lies within idx's neighborhood by the near-case guard");
                self.slots.set_free(idx);
                self.nbhds
                    .clear(idx, 0)
                    .expect("home offset 0 is always valid");
                self.nbhds
                    .clear(home, (idx - home) as u32)
                    .expect("idx lay within home's neighborhood before the hop");

                log::trace!("free_up: hopped entry {entry} from bucket {idx} to {act_idx}");
                return Ok(());
            }

            // Far case: drag the free slot backwards towards idx.
            let lower = idx.max(act_idx.saturating_sub(width)) + 1;
            let mut moved = false;

            for i in lower..act_idx {
                let displaced = self.nbhds.displaced_neighbors(i);
                let is_last_candidate = i == act_idx - 1;

                if is_last_candidate
                    && (displaced.is_empty() || *displaced.first().unwrap() > act_idx)
                {
                    return Err(NoSpace);
                }

                if displaced.is_empty() {
                    continue;
                }

                let hop_idx = displaced[0];
                if hop_idx < act_idx {
                    let moved_entry = self
                        .slots
                        .get(hop_idx)
                        .expect("closest displaced neighbor must be occupied");
                    self.slots.set(act_idx, moved_entry);
                    self.slots.set_free(hop_idx);
                    self.nbhds
                        .set(i, (act_idx - i) as u32)
                        .expect("act_idx lies within i's neighborhood by the far-case window");
                    self.nbhds
                        .clear(i, (hop_idx - i) as u32)
                        .expect("hop_idx lay within i's neighborhood before the hop");

                    log::trace!("free_up: dragged hole from {act_idx} to {hop_idx} via home {i}");
                    act_idx = hop_idx;
                    moved = true;
                    break;
                }
            }

            if !moved {
                return Err(NoSpace);
            }
        }
    }
}

/// Picks the neighborhood width needed for `size` buckets, never
/// narrower than `current_width`. Takes `max(current_width,
/// ceil(log2(size)))` and rounds that up to the next allowed width.
/// `size` must already be a power of two.
pub(crate) fn required_width(size: usize, current_width: u32) -> Result<u32, HopscotchError> {
    let raw = current_width.max(size.trailing_zeros());
    ALLOWED_WIDTHS
        .into_iter()
        .find(|&w| w >= raw)
        .ok_or(HopscotchError::CapacityExceeded)
}

/// Rebuilds the probe structures at capacity `requested_size`,
/// replaying `hashes` (in entry-index order, so placement is
/// deterministic) into the fresh table. Recurses to double the
/// capacity if a replay cannot maintain the neighborhood invariant.
pub(crate) fn resize(
    hashes: &[u64],
    requested_size: usize,
    current_width: u32,
) -> Result<Table, HopscotchError> {
    if requested_size == 0 || requested_size & (requested_size - 1) != 0 {
        return Err(HopscotchError::BadArgument(format!(
            "resize target {requested_size} is not a power of two"
        )));
    }

    let width = required_width(requested_size, current_width)?;
    let mut table = Table::new(requested_size, width);

    for (data_idx, &hash) in hashes.iter().enumerate() {
        let home = (hash as usize) % table.size;

        if table.slots.is_free(home) {
            table.slots.set(home, data_idx);
            table
                .nbhds
                .set(home, 0)
                .expect("home offset 0 is always valid");
            continue;
        }

        match table.free_up(home, hashes) {
            Ok(()) => {
                table.slots.set(home, data_idx);
                table
                    .nbhds
                    .set(home, 0)
                    .expect("home offset 0 is always valid");
            }
            Err(NoSpace) => {
                let bigger = requested_size * 2;
                log::warn!(
                    "resize: free_up failed mid-replay at bucket {home}, growing {requested_size} -> {bigger}"
                );
                return resize(hashes, bigger, width);
            }
        }
    }

    log::debug!("resize: rebuilt table at size {requested_size}, width {width}");
    Ok(table)
}

/// Growth policy: quadruples the table size below 2^16 entries,
/// doubles it after.
pub(crate) fn next_growth_size(current: usize) -> usize {
    if current < (1 << 16) {
        current * 4
    } else {
        current * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home(hash: u64, size: usize) -> usize {
        (hash as usize) % size
    }

    #[test]
    fn required_width_grows_to_next_allowed_size() {
        // S=512 has ceil(log2(512)) = 9, current H=8 -> max(8,9)=9 -> next allowed 16.
        assert_eq!(required_width(512, 8).unwrap(), 16);
        assert_eq!(required_width(8, 8).unwrap(), 8);
        assert_eq!(required_width(256, 8).unwrap(), 8);
    }

    #[test]
    fn free_up_near_case_hops_one_slot() {
        // Keys 1..=5 all hash to their own value (identity hashes) in an
        // 8-bucket table; bucket 1 is occupied, bucket 6 and 7 are free.
        let hashes: Vec<u64> = vec![1, 2, 3, 4, 5];
        let mut table = Table::new(8, 8);
        for (i, &h) in hashes.iter().enumerate() {
            let b = home(h, 8);
            table.slots.set(b, i);
            table.nbhds.set(b, 0).unwrap();
        }

        table.free_up(1, &hashes).unwrap();

        assert!(table.slots.is_free(1));
        assert_eq!(table.slots.get(6), Some(0)); // entry for key "1" (index 0) moved to bucket 6
        assert_eq!(table.nbhds.displaced_neighbors(1), vec![6]);
    }

    #[test]
    fn free_up_on_already_free_bucket_is_noop() {
        let hashes: Vec<u64> = vec![];
        let mut table = Table::new(8, 8);
        assert!(table.free_up(3, &hashes).is_ok());
        assert!(table.slots.is_free(3));
    }

    #[test]
    fn free_up_far_case_cascades_through_intermediate_home() {
        // Keys 1..=10 at identity hashes in a 32-bucket table (the
        // state a size-8 table reaches after inserting 1..=10 triggers
        // one ×4 growth at key 7). Bucket 11 is the first free slot
        // reachable from bucket 1, which is more than H=8 away, so
        // free_up must drag the hole backwards: the entry homed at 4
        // (the farthest-in-range occupied home) hops out to 11 first,
        // then the entry at 1 hops into the now-free bucket 4.
        let hashes: Vec<u64> = (1..=10).collect();
        let mut table = Table::new(32, 8);
        for (idx, &h) in hashes.iter().enumerate() {
            let home = (h as usize) % table.size;
            table.slots.set(home, idx);
            table.nbhds.set(home, 0).unwrap();
        }

        table.free_up(1, &hashes).unwrap();

        assert!(table.slots.is_free(1));
        assert_eq!(table.slots.get(4), Some(0)); // key "1" (entry 0) hopped to bucket 4
        assert_eq!(table.slots.get(11), Some(3)); // key "4" (entry 3) hopped to bucket 11
        assert_eq!(table.nbhds.displaced_neighbors(1), vec![4]);
        assert_eq!(table.nbhds.displaced_neighbors(4), vec![11]);
    }

    #[test]
    fn free_up_fails_when_table_has_no_free_slot() {
        // Every bucket of a size-8 table occupied by its own identity
        // hash: no free slot anywhere, so free_up cannot open any bucket.
        let hashes: Vec<u64> = (0..8).collect();
        let mut table = Table::new(8, 8);
        for (idx, &h) in hashes.iter().enumerate() {
            table.slots.set(h as usize, idx);
            table.nbhds.set(h as usize, 0).unwrap();
        }

        assert!(table.free_up(0, &hashes).is_err());
    }

    #[test]
    fn resize_increases_width_when_required() {
        let hashes: Vec<u64> = (0..10).collect();
        let table = resize(&hashes, 512, 8).unwrap();
        assert_eq!(table.size, 512);
        assert_eq!(table.nbhd_width(), 16);
    }

    #[test]
    fn resize_rejects_non_power_of_two() {
        let hashes: Vec<u64> = vec![];
        assert!(matches!(
            resize(&hashes, 300, 8),
            Err(HopscotchError::BadArgument(_))
        ));
    }

    #[test]
    fn resize_replays_all_entries_findable() {
        let hashes: Vec<u64> = (0..50).map(|i| i * 7).collect();
        let table = resize(&hashes, 64, 8).unwrap();
        for (idx, &h) in hashes.iter().enumerate() {
            let home = (h as usize) % table.size;
            let found = table
                .nbhds
                .displaced_neighbors(home)
                .into_iter()
                .any(|b| table.slots.get(b) == Some(idx));
            assert!(found, "entry {idx} with hash {h} not found after resize");
        }
    }

    #[test]
    fn growth_policy_quadruples_below_64k_then_doubles() {
        assert_eq!(next_growth_size(8), 32);
        assert_eq!(next_growth_size(1 << 15), 1 << 17);
        assert_eq!(next_growth_size(1 << 16), 1 << 17);
        assert_eq!(next_growth_size(1 << 17), 1 << 18);
    }
}
