use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rust_nnp_layer::utils::XorShiftRng;
use rust_nnp_layer::{Activation, DenseLayer, Layer};

const NUM_INPUTS: usize = 64;
const NUM_OUTPUTS: usize = 32;
const BATCH_SIZE: usize = 256;

fn layer_with_batch(activation: Activation) -> DenseLayer<f64> {
    let mut rng = XorShiftRng::new(0);
    let mut layer = DenseLayer::new(NUM_INPUTS, NUM_OUTPUTS, activation).unwrap();
    layer.randomize_weights(&mut rng);
    layer.set_size_of_batch(BATCH_SIZE).unwrap();
    for value in layer.input_mut() {
        *value = rng.uniform(-1.0, 1.0);
    }
    layer
}

fn dense_forward_bench(c: &mut Criterion) {
    let mut layer = layer_with_batch(Activation::TwistedTanh);
    let mut output = vec![0.0; NUM_OUTPUTS * BATCH_SIZE];

    c.bench_function("dense_forward_64_32_twtanh_b256", |b| {
        b.iter(|| {
            layer.go_forward(black_box(&mut output)).unwrap();
        })
    });
}

fn dense_backward_bench(c: &mut Criterion) {
    let mut layer = layer_with_batch(Activation::Gelu);
    let mut output = vec![0.0; NUM_OUTPUTS * BATCH_SIZE];
    let mut grad = vec![1.0; NUM_OUTPUTS * BATCH_SIZE];

    c.bench_function("dense_forward_backward_64_32_gelu_b256", |b| {
        b.iter(|| {
            layer.go_forward(&mut output).unwrap();
            grad.fill(1.0);
            layer.go_backward(black_box(&mut grad), true).unwrap();
            black_box(layer.input_gradient());
        })
    });
}

criterion_group!(benches, dense_forward_bench, dense_backward_bench);
criterion_main!(benches);
