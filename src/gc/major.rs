//! Major collection
//!
//! Compacts the old space in place with a single sliding pass:
//! 1. Walk the blocks in address order, keeping a pending free region that
//!    opens at the first free block.
//! 2. Further free blocks are merged into the pending region.
//! 3. A used block found while a region is pending slides down to the
//!    region's start; the region moves up behind it, keeping its length.
//! 4. Whatever region is left at the end becomes the only free block.
//!
//! Headers travel with their payload, so handle index and survival count
//! are preserved. Handle slots are retargeted as blocks move.

use super::allocator::{Address, SpaceId};
use super::collector::GcStats;
use super::handles::Handle;
use super::heap::Heap;
use super::header::HEADER_SIZE;

/// Run a major collection on `heap`
pub(crate) fn collect(heap: &mut Heap) -> GcStats {
    let Heap {
        arenas, handles, ..
    } = heap;
    let old = &mut arenas[SpaceId::Old.index()];
    let capacity = old.capacity();

    let mut stats = GcStats::default();
    // (start, length) of the free region below the scan position
    let mut pending: Option<(usize, usize)> = None;
    let mut read_offset = 0;

    while read_offset + HEADER_SIZE <= capacity {
        let header = old.header(read_offset);
        let block_size = header.total_size();

        if header.free {
            pending = Some(match pending {
                None => (read_offset, block_size),
                Some((start, len)) => (start, len + block_size),
            });
        } else {
            stats.objects_visited += 1;

            if let Some((start, len)) = pending {
                old.bytes_mut()
                    .copy_within(read_offset..read_offset + block_size, start);

                match header.handle {
                    Some(raw) => handles.set(
                        Handle::from_raw(raw),
                        Address::new(SpaceId::Old, start + HEADER_SIZE),
                    ),
                    None => log::warn!("old block at {:#x} has no handle", read_offset),
                }

                stats.objects_moved += 1;
                stats.bytes_moved += block_size;
                pending = Some((start + block_size, len));
            }
        }

        read_offset += block_size;
    }

    match pending {
        Some((start, _)) => old.set_free_tail(start),
        None => old.set_free_tail(capacity),
    }
    stats.free_bytes = old.free_bytes();

    log::info!("major collection: {}", stats);
    stats
}

#[cfg(test)]
mod tests {
    use crate::config::HeapConfig;
    use crate::gc::{HEADER_SIZE, Handle, Heap, SpaceId};

    /// Promote `sizes.len()` objects into an otherwise empty old space
    fn heap_with_old_objects(sizes: &[usize]) -> (Heap, Vec<Handle>) {
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let handles: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let h = heap.allocate(size).unwrap();
                heap.payload_mut(h).unwrap().fill(i as u8 + 1);
                h
            })
            .collect();
        for _ in 0..3 {
            heap.minor_collection().unwrap();
        }
        for &h in &handles {
            assert_eq!(heap.dereference(h).unwrap().space, SpaceId::Old);
        }
        (heap, handles)
    }

    fn layout(heap: &Heap) -> Vec<(bool, usize)> {
        heap.blocks(SpaceId::Old).map(|b| (b.free, b.size)).collect()
    }

    #[test]
    fn test_compaction_slides_live_blocks() {
        // F1 U1 F2 U2 trailing
        let (mut heap, h) = heap_with_old_objects(&[16, 24, 32, 8]);
        heap.release(h[0]).unwrap();
        heap.release(h[2]).unwrap();
        assert_eq!(
            layout(&heap),
            vec![
                (true, 16),
                (false, 24),
                (true, 32),
                (false, 8),
                (true, 1024 - 144 - HEADER_SIZE)
            ]
        );

        let stats = heap.major_collection();
        assert_eq!(stats.objects_visited, 2);
        assert_eq!(stats.objects_moved, 2);

        let free = 16 + 32 + (1024 - 144 - HEADER_SIZE) + 2 * HEADER_SIZE;
        assert_eq!(layout(&heap), vec![(false, 24), (false, 8), (true, free)]);
        assert_eq!(heap.free_list(SpaceId::Old), &[64]);

        assert_eq!(heap.dereference(h[1]).unwrap().offset, HEADER_SIZE);
        assert_eq!(heap.dereference(h[3]).unwrap().offset, 40 + HEADER_SIZE);
        assert!(heap.payload(h[1]).unwrap().iter().all(|&b| b == 2));
        assert!(heap.payload(h[3]).unwrap().iter().all(|&b| b == 4));
        heap.verify().unwrap();
    }

    #[test]
    fn test_compaction_preserves_header_fields() {
        let (mut heap, h) = heap_with_old_objects(&[8, 8]);
        heap.release(h[0]).unwrap();

        heap.major_collection();
        let first = heap.blocks(SpaceId::Old).next().unwrap();
        assert_eq!(first.handle, Some(h[1]));
        assert_eq!(first.survival, 3);
        assert!(!first.free);
    }

    #[test]
    fn test_compaction_without_holes_is_a_no_op() {
        let (mut heap, h) = heap_with_old_objects(&[8, 16]);
        let before = heap.arena(SpaceId::Old).bytes().to_vec();
        let addrs: Vec<_> = h.iter().map(|&h| heap.dereference(h).unwrap()).collect();

        let stats = heap.major_collection();
        assert_eq!(stats.objects_moved, 0);
        assert_eq!(heap.arena(SpaceId::Old).bytes(), &before[..]);
        for (&h, addr) in h.iter().zip(addrs) {
            assert_eq!(heap.dereference(h).unwrap(), addr);
        }
        heap.verify().unwrap();
    }

    #[test]
    fn test_compaction_merges_adjacent_free_blocks() {
        let (mut heap, h) = heap_with_old_objects(&[8, 8, 8]);
        for &handle in &h {
            heap.release(handle).unwrap();
        }
        assert_eq!(heap.free_list(SpaceId::Old).len(), 4);

        heap.major_collection();
        assert_eq!(layout(&heap), vec![(true, 1024 - HEADER_SIZE)]);
        assert_eq!(heap.free_list(SpaceId::Old), &[0]);
        heap.verify().unwrap();
    }

    #[test]
    fn test_compaction_of_full_old_space() {
        let config = HeapConfig::default().with_old_size(64);
        let mut heap = Heap::new(config).unwrap();
        let a = heap.allocate(8).unwrap();
        let b = heap.allocate(8).unwrap();
        for _ in 0..3 {
            heap.minor_collection().unwrap();
        }
        // 24 + 40 (absorbed) = 64: no free block left
        assert!(heap.free_list(SpaceId::Old).is_empty());
        heap.release(a).unwrap();

        heap.major_collection();
        assert_eq!(heap.dereference(b).unwrap().offset, HEADER_SIZE);
        assert_eq!(heap.free_list(SpaceId::Old), &[40]);
        heap.verify().unwrap();
    }

    #[test]
    fn test_compaction_frees_room_for_promotion() {
        let (mut heap, h) = heap_with_old_objects(&[200, 8, 200, 8, 200, 8]);
        for i in [0, 2, 4] {
            heap.release(h[i]).unwrap();
        }
        // Fragmented: no hole can take 400 bytes
        assert!(heap.arena(SpaceId::Old).find_fit(heap.config().strategy, 416).is_none());

        heap.major_collection();
        assert!(heap.arena(SpaceId::Old).find_fit(heap.config().strategy, 416).is_some());
    }
}
