//! Benchmarks for the layer integrators

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{DMatrix, DVector, RowDVector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use olfsim_core::{ModelParams, OrnData};
use olfsim_native::connectivity::sample_wpnkc;
use olfsim_native::layers::{pn_noise, sim_kc_layer, sim_ln_layer, sim_orn_layer, sim_pn_layer, KcScratch};
use olfsim_native::KcCircuit;

/// Synthetic glomerular data with a spread of spontaneous rates and deltas
fn generate_data(n_gloms: usize) -> OrnData {
    let spont = DVector::from_fn(n_gloms, |g, _| 2.0 + (g as f64 * 0.37).sin().abs() * 15.0);
    let delta = DMatrix::from_fn(n_gloms, 1, |g, _| (g as f64 * 1.3).cos() * 80.0);
    OrnData::new(spont, delta).unwrap()
}

fn bench_orn_ln(c: &mut Criterion) {
    let mut group = c.benchmark_group("orn_ln");
    let p = ModelParams::default();

    for n_gloms in [24, 51].iter() {
        let data = generate_data(*n_gloms);
        group.bench_with_input(BenchmarkId::from_parameter(n_gloms), n_gloms, |b, _| {
            b.iter(|| {
                let orn = sim_orn_layer(&p, &data, black_box(0));
                black_box(sim_ln_layer(&p, &orn))
            });
        });
    }

    group.finish();
}

fn bench_pn(c: &mut Criterion) {
    let mut group = c.benchmark_group("pn");
    let mut p = ModelParams::default();
    p.pn.noise.sd = 1.0;

    for n_gloms in [24, 51].iter() {
        let data = generate_data(*n_gloms);
        let orn = sim_orn_layer(&p, &data, 0);
        let ln = sim_ln_layer(&p, &orn);
        let noise = pn_noise(&p).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(n_gloms), n_gloms, |b, _| {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            b.iter(|| black_box(sim_pn_layer(&p, &data, &orn, &ln.inh_a, &ln.inh_b, &noise, &mut rng)));
        });
    }

    group.finish();
}

fn bench_kc(c: &mut Criterion) {
    let mut group = c.benchmark_group("kc");
    group.sample_size(10);
    let p = ModelParams::default();
    let n_gloms = 51;
    let data = generate_data(n_gloms);
    let orn = sim_orn_layer(&p, &data, 0);
    let ln = sim_ln_layer(&p, &orn);
    let noise = pn_noise(&p).unwrap();
    let pn = sim_pn_layer(&p, &data, &orn, &ln.inh_a, &ln.inh_b, &noise, &mut ChaCha8Rng::seed_from_u64(0));

    for n_kc in [500, 2000].iter() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let circuit = KcCircuit {
            w_pnkc: sample_wpnkc(&vec![1.0; n_gloms], *n_kc, 6, &mut rng).unwrap(),
            w_aplkc: DVector::from_element(*n_kc, 4.0),
            w_kcapl: RowDVector::from_element(*n_kc, 4.0 / *n_kc as f64),
            thr: DVector::from_element(*n_kc, 200.0),
        };

        group.bench_with_input(BenchmarkId::from_parameter(n_kc), n_kc, |b, _| {
            let mut scratch = KcScratch::new(*n_kc, p.time.steps_all());
            b.iter(|| {
                sim_kc_layer(&p, &circuit, black_box(&pn), &mut scratch);
                black_box(scratch.spike_counts())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_orn_ln, bench_pn, bench_kc);
criterion_main!(benches);
