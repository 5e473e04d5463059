// Tests for the batch buffer lifecycle: lazy allocation, grow-only capacity,
// named buffers on the injected allocator and release on drop.

use std::sync::Arc;

use rust_nnp_layer::memory::{good_memory_size, BufferAllocator, TrackingAllocator};
use rust_nnp_layer::{Activation, DenseLayer, Layer, NnpError};

fn tracked_layer(tracker: &Arc<TrackingAllocator>, tag: usize) -> DenseLayer<f64> {
    let allocator: Arc<dyn BufferAllocator<f64>> = tracker.clone();
    DenseLayer::with_allocator(3, 2, Activation::Tanh, tag, allocator).unwrap()
}

#[test]
fn test_no_allocation_at_construction() {
    let tracker = Arc::new(TrackingAllocator::new());
    let layer = tracked_layer(&tracker, 0);

    assert_eq!(tracker.create_count(), 0);
    assert_eq!(layer.batch_capacity(), 0);
    assert!(layer.input().is_empty());
    assert!(layer.input_gradient().is_empty());
}

#[test]
fn test_zero_batch_rejected() {
    let tracker = Arc::new(TrackingAllocator::new());
    let mut layer = tracked_layer(&tracker, 0);

    assert!(matches!(
        layer.set_size_of_batch(0),
        Err(NnpError::NonPositiveBatch)
    ));
    assert_eq!(tracker.create_count(), 0);
}

#[test]
fn test_buffers_are_named_and_sized_by_node_count() {
    let tracker = Arc::new(TrackingAllocator::new());
    let mut layer = tracked_layer(&tracker, 7);
    layer.set_size_of_batch(5).unwrap();

    let capacity = good_memory_size(5);
    assert_eq!(layer.batch_capacity(), capacity);
    assert_eq!(tracker.live_len("nnp:inpData7"), Some(3 * capacity));
    assert_eq!(tracker.live_len("nnp:inpGrad7"), Some(3 * capacity));
    assert_eq!(tracker.live_len("nnp:outDrv17"), Some(2 * capacity));
    assert_eq!(tracker.create_count(), 3);

    assert_eq!(layer.batch_size(), 5);
    assert_eq!(layer.input().len(), 15);
    assert_eq!(layer.input_gradient().len(), 15);
}

#[test]
fn test_capacity_never_decreases() {
    let tracker = Arc::new(TrackingAllocator::new());
    let mut layer = tracked_layer(&tracker, 0);

    let mut previous = 0;
    for size in [1, 2, 3, 7, 8, 9, 15, 33, 100, 1000] {
        layer.set_size_of_batch(size).unwrap();
        assert!(layer.batch_capacity() >= size);
        assert!(layer.batch_capacity() >= previous);
        previous = layer.batch_capacity();
    }

    // far fewer reallocations than calls
    assert!(tracker.grow_count() < 3 * 10);
}

#[test]
fn test_smaller_batch_keeps_allocation() {
    let tracker = Arc::new(TrackingAllocator::new());
    let mut layer = tracked_layer(&tracker, 0);

    layer.set_size_of_batch(20).unwrap();
    let capacity = layer.batch_capacity();
    let address = layer.input().as_ptr();
    let grows = tracker.grow_count();

    for size in [19, 4, 1, capacity] {
        layer.set_size_of_batch(size).unwrap();
        assert_eq!(layer.batch_capacity(), capacity);
        assert_eq!(layer.input().as_ptr(), address);
        assert_eq!(layer.input().len(), 3 * size);
    }
    assert_eq!(tracker.grow_count(), grows);

    layer.set_size_of_batch(capacity + 1).unwrap();
    assert!(layer.batch_capacity() > capacity);
    assert_eq!(tracker.grow_count(), grows + 3);
}

#[test]
fn test_growth_preserves_input_content() {
    let tracker = Arc::new(TrackingAllocator::new());
    let mut layer = tracked_layer(&tracker, 0);

    layer.set_size_of_batch(2).unwrap();
    layer.input_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    layer.set_size_of_batch(100).unwrap();

    assert_eq!(&layer.input()[..6], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_drop_releases_buffers() {
    let tracker = Arc::new(TrackingAllocator::new());
    {
        let mut first = tracked_layer(&tracker, 0);
        let mut second = tracked_layer(&tracker, 1);
        first.set_size_of_batch(10).unwrap();
        second.set_size_of_batch(3).unwrap();
        assert_eq!(tracker.create_count(), 6);
        assert!(tracker.total_live() > 0);
    }

    assert_eq!(tracker.destroy_count(), 6);
    assert_eq!(tracker.total_live(), 0);
}

#[test]
fn test_drop_without_batch_destroys_nothing() {
    let tracker = Arc::new(TrackingAllocator::new());
    drop(tracked_layer(&tracker, 0));
    assert_eq!(tracker.destroy_count(), 0);
}
