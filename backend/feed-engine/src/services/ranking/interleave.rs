use tracing::debug;

/// Insert sponsored entries into an organic list at a fixed cadence.
///
/// Slot `cadence - 1`, `2 * cadence - 1`, … (zero-based) is sponsored. The
/// organic entry that would have held that slot moves one position later;
/// nothing organic is dropped. A sponsored entry is only placed once the list
/// has grown to its slot, leftovers are discarded.
pub fn interleave_sponsored<T>(organic: Vec<T>, sponsored: Vec<T>, cadence: usize) -> Vec<T> {
    if cadence < 2 || sponsored.is_empty() {
        return organic;
    }

    let mut out = Vec::with_capacity(organic.len() + sponsored.len());
    let mut sponsored = sponsored.into_iter();
    let mut pending = sponsored.next();

    for entry in organic {
        if out.len() % cadence == cadence - 1 {
            if let Some(ad) = pending.take() {
                out.push(ad);
                pending = sponsored.next();
            }
        }
        out.push(entry);
    }

    // The slot right after the last organic entry can still take one
    if out.len() % cadence == cadence - 1 {
        if let Some(ad) = pending.take() {
            out.push(ad);
            pending = sponsored.next();
        }
    }

    let dropped = pending.into_iter().chain(sponsored).count();
    if dropped > 0 {
        debug!(dropped = dropped, "Sponsored entries left without a slot");
    }

    out
}
