use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use boundary_mlp::{
    Dataset, DatasetKind, MAX_BATCH, OptimizerConfig, OptimizerKind, Trainer, TrainerConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

struct CountingAlloc {
    allocs: AtomicUsize,
    reallocs: AtomicUsize,
    deallocs: AtomicUsize,
    bytes: AtomicUsize,
}

impl CountingAlloc {
    const fn new() -> Self {
        Self {
            allocs: AtomicUsize::new(0),
            reallocs: AtomicUsize::new(0),
            deallocs: AtomicUsize::new(0),
            bytes: AtomicUsize::new(0),
        }
    }

    fn reset(&self) {
        self.allocs.store(0, Ordering::Relaxed);
        self.reallocs.store(0, Ordering::Relaxed);
        self.deallocs.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> AllocSnapshot {
        AllocSnapshot {
            allocs: self.allocs.load(Ordering::Relaxed),
            reallocs: self.reallocs.load(Ordering::Relaxed),
            deallocs: self.deallocs.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }

    fn alloc_events(&self) -> usize {
        self.allocs.load(Ordering::Relaxed) + self.reallocs.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllocSnapshot {
    allocs: usize,
    reallocs: usize,
    deallocs: usize,
    bytes: usize,
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(layout.size(), Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(layout.size(), Ordering::Relaxed);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.deallocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.reallocs.fetch_add(1, Ordering::Relaxed);
        // Approximate accounting: record the new size.
        self.bytes.fetch_add(new_size, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

fn alloc_events_for(steps: usize, kind: OptimizerKind, data: &Dataset) -> (usize, AllocSnapshot) {
    let mut trainer = Trainer::new(TrainerConfig {
        batch_size: MAX_BATCH,
        optimizer: OptimizerConfig::default().with_kind(kind),
        target_loss_enabled: false,
        history_capacity: 64,
        ..TrainerConfig::default()
    });
    // The first step builds the optimizer state for `kind`; fill the history too.
    for _ in 0..64 {
        trainer.step_once(data);
    }

    ALLOC.reset();
    for _ in 0..steps {
        trainer.step_once(data);
    }
    let events = ALLOC.alloc_events();
    (events, ALLOC.snapshot())
}

#[test]
fn training_steps_do_not_allocate() {
    let mut rng = StdRng::seed_from_u64(0);
    let data = Dataset::generate(DatasetKind::TwoMoons, 1000, 0.2, &mut rng);

    for kind in OptimizerKind::ALL {
        let (few, few_snap) = alloc_events_for(1, kind, &data);
        let (many, many_snap) = alloc_events_for(50, kind, &data);
        assert_eq!(
            few, many,
            "{kind:?}: expected allocation event count to be independent of steps.\n\
few: {few_snap:?}\n\
many: {many_snap:?}"
        );
    }
}
