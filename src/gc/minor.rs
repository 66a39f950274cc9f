//! Minor collection
//!
//! Copies every live object of the current young space either into the
//! other young space, packed from offset 0 in handle order, or, once it has
//! survived enough collections, into the old space. The other young space
//! then becomes current. The abandoned space is not cleaned up; its bytes
//! are overwritten the next time it is the copy target.
//!
//! Promotions are staged against a copy of the old arena first. If one of
//! them does not fit, the collection fails before anything is mutated.

use super::allocator::{Address, Arena, SpaceId};
use super::collector::GcStats;
use super::handles::Handle;
use super::header::{BlockHeader, HEADER_SIZE};
use super::heap::Heap;
use crate::error::HeapError;

/// A live young object and where it is headed
struct Survivor {
    handle: Handle,
    /// Payload offset in the from-space
    offset: usize,
    header: BlockHeader,
    /// Payload offset in the staged old arena, if promoted
    promoted_to: Option<usize>,
}

/// Run a minor collection on `heap`
pub(crate) fn collect(heap: &mut Heap) -> Result<GcStats, HeapError> {
    let from = heap.current;
    let to = from.other_young();
    let threshold = heap.config.promotion_threshold;
    let strategy = heap.config.strategy;

    let mut survivors: Vec<Survivor> = {
        let from_arena = heap.arena(from);
        heap.handles
            .live()
            .filter(|(_, address)| address.space == from)
            .map(|(handle, address)| {
                let mut header = from_arena.header(address.header_offset());
                header.survival += 1;
                Survivor {
                    handle,
                    offset: address.offset,
                    header,
                    promoted_to: None,
                }
            })
            .collect()
    };

    // Promotions are staged in a copy of the old space, taken only when
    // something is actually promoted
    let mut old = survivors
        .iter()
        .any(|survivor| survivor.header.survival >= threshold)
        .then(|| heap.arena(SpaceId::Old).clone());
    if let Some(old) = old.as_mut() {
        for survivor in survivors
            .iter_mut()
            .filter(|survivor| survivor.header.survival >= threshold)
        {
            match old.allocate(survivor.header.size, strategy) {
                Ok(offset) => survivor.promoted_to = Some(offset),
                Err(_) => {
                    log::warn!(
                        "minor collection aborted: cannot promote {} ({} bytes)",
                        survivor.handle,
                        survivor.header.size
                    );
                    return Err(HeapError::PromotionFailed {
                        handle: survivor.handle,
                        size: survivor.header.size,
                    });
                }
            }
        }
    }

    let mut stats = GcStats {
        objects_visited: survivors.len(),
        ..Default::default()
    };

    let (from_arena, to_arena) = young_pair(heap, from);
    let mut cursor = 0;
    let mut retargets = Vec::with_capacity(survivors.len());

    for survivor in &survivors {
        let source = from_arena.payload(survivor.offset);

        match (survivor.promoted_to, old.as_mut()) {
            (Some(offset), Some(old)) => {
                let header_offset = offset - HEADER_SIZE;
                let mut header = old.header(header_offset);
                header.handle = Some(survivor.handle.raw());
                header.survival = survivor.header.survival;
                old.set_header(header_offset, &header);
                old.payload_mut(offset)[..source.len()].copy_from_slice(source);

                stats.objects_promoted += 1;
                stats.bytes_moved += survivor.header.total_size();
                retargets.push((survivor.handle, Address::new(SpaceId::Old, offset)));
            }
            _ => {
                let total = survivor.header.total_size();
                to_arena.set_header(cursor, &survivor.header);
                to_arena.bytes_mut()[cursor + HEADER_SIZE..cursor + total]
                    .copy_from_slice(source);

                stats.objects_moved += 1;
                stats.bytes_moved += total;
                retargets.push((survivor.handle, Address::new(to, cursor + HEADER_SIZE)));
                cursor += total;
            }
        }
    }

    to_arena.set_free_tail(cursor);
    stats.free_bytes = to_arena.free_bytes();

    if let Some(old) = old {
        heap.arenas[SpaceId::Old.index()] = old;
    }
    for (handle, address) in retargets {
        heap.handles.set(handle, address);
    }
    heap.current = to;

    log::info!("minor collection {} -> {}: {}", from, to, stats);
    Ok(stats)
}

/// Borrow the from-space immutably and the other young space mutably
fn young_pair(heap: &mut Heap, from: SpaceId) -> (&Arena, &mut Arena) {
    let [young0, young1, _] = &mut heap.arenas;
    match from {
        SpaceId::Young0 => (&*young0, young1),
        _ => (&*young1, young0),
    }
}
