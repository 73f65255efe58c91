//! Double-buffered persistent velocity textures.

use pixelflow_graph::{TextureDesc, TexturePool};

const SLOT_A_LABEL: &str = "velocity target A";
const SLOT_B_LABEL: &str = "velocity target B";

/// Owns the two persistent velocity textures and the alternating
/// current/previous designation. The textures survive across frames
/// until [`release`](Self::release); the designation flips exactly once
/// per [`acquire`](Self::acquire) call.
pub struct DoubleBufferStore<T> {
    slot_a: Option<T>,
    slot_b: Option<T>,
    use_a: bool,
}

impl<T> Default for DoubleBufferStore<T> {
    fn default() -> Self {
        Self {
            slot_a: None,
            slot_b: None,
            use_a: true,
        }
    }
}

impl<T> DoubleBufferStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure both slots match `desc` and hand out this frame's
    /// (current, previous) pair.
    ///
    /// A physical slot is reallocated only when the requested
    /// descriptor differs from what it was allocated with; the pool
    /// clears fresh allocations, so "previous" is either exactly what
    /// was committed as "current" on the preceding frame or the cleared
    /// state, never garbage.
    pub fn acquire<P>(&mut self, pool: &mut P, desc: &TextureDesc) -> (&T, &T)
    where
        P: TexturePool<Texture = T>,
    {
        let mut desc_a = *desc;
        desc_a.label = SLOT_A_LABEL;
        let mut desc_b = *desc;
        desc_b.label = SLOT_B_LABEL;

        if pool.allocate_or_resize(&mut self.slot_a, &desc_a) {
            log::debug!("velocity slot A allocated at {}x{}", desc.width, desc.height);
        }
        if pool.allocate_or_resize(&mut self.slot_b, &desc_b) {
            log::debug!("velocity slot B allocated at {}x{}", desc.width, desc.height);
        }

        let (current, previous) = if self.use_a {
            (self.slot_a.as_ref(), self.slot_b.as_ref())
        } else {
            (self.slot_b.as_ref(), self.slot_a.as_ref())
        };
        self.use_a = !self.use_a;

        match (current, previous) {
            (Some(current), Some(previous)) => (current, previous),
            // allocate_or_resize fills both slots above.
            _ => unreachable!("both velocity slots are allocated before designation"),
        }
    }

    /// Return both textures to the pool and reset the designation.
    pub fn release<P>(&mut self, pool: &mut P)
    where
        P: TexturePool<Texture = T>,
    {
        if let Some(texture) = self.slot_a.take() {
            pool.release(texture);
        }
        if let Some(texture) = self.slot_b.take() {
            pool.release(texture);
        }
        self.use_a = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelflow_graph::{FilterMode, LinearPool, TextureFormat, WrapMode};

    fn desc(width: u32, height: u32) -> TextureDesc {
        TextureDesc {
            width,
            height,
            format: TextureFormat::Rgba16Float,
            filter: FilterMode::Bilinear,
            wrap: WrapMode::Clamp,
            label: "velocity target",
        }
    }

    #[test]
    fn test_designation_alternates_with_period_two() {
        let mut pool = LinearPool::new();
        let mut store = DoubleBufferStore::new();

        let labels: Vec<_> = (0..4)
            .map(|_| store.acquire(&mut pool, &desc(64, 64)).0.desc().label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "velocity target A",
                "velocity target B",
                "velocity target A",
                "velocity target B",
            ]
        );
    }

    #[test]
    fn test_current_and_previous_are_distinct_slots() {
        let mut pool = LinearPool::new();
        let mut store = DoubleBufferStore::new();
        let (current, previous) = store.acquire(&mut pool, &desc(64, 64));
        assert!(!current.same_allocation(previous));
    }

    #[test]
    fn test_previous_is_last_frames_current() {
        let mut pool = LinearPool::new();
        let mut store = DoubleBufferStore::new();
        let first_current = store.acquire(&mut pool, &desc(64, 64)).0.clone();
        let (_, previous) = store.acquire(&mut pool, &desc(64, 64));
        assert!(first_current.same_allocation(previous));
    }

    #[test]
    fn test_stable_desc_allocates_exactly_once_per_slot() {
        let mut pool = LinearPool::new();
        let mut store = DoubleBufferStore::new();
        for _ in 0..5 {
            store.acquire(&mut pool, &desc(64, 64));
        }
        assert_eq!(pool.allocations, 2);
    }

    #[test]
    fn test_resize_reallocates_each_slot_once_and_keeps_parity() {
        let mut pool = LinearPool::new();
        let mut store = DoubleBufferStore::new();
        store.acquire(&mut pool, &desc(64, 64));
        store.acquire(&mut pool, &desc(64, 64));

        let (current, _) = store.acquire(&mut pool, &desc(128, 128));
        assert_eq!(pool.allocations, 4);
        assert_eq!(current.desc().width, 128);
        // Parity keeps alternating through the reallocation: A, B, A.
        assert_eq!(current.desc().label, "velocity target A");
    }

    #[test]
    fn test_release_returns_both_slots() {
        let mut pool = LinearPool::new();
        let mut store = DoubleBufferStore::new();
        store.acquire(&mut pool, &desc(64, 64));
        store.release(&mut pool);
        assert_eq!(pool.released, 2);

        // The store is reusable after release, starting from slot A.
        let (current, _) = store.acquire(&mut pool, &desc(64, 64));
        assert_eq!(current.desc().label, "velocity target A");
    }
}
