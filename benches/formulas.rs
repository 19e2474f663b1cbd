//! Criterion benchmarks for the formula modules.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rlhf_viz::gae::{compute_gae, demo, kl_penalized_scores, GaeParams};
use rlhf_viz::logprob::sequence_log_probs;
use rlhf_viz::padding::{pad_tokens, EOT_ID};
use rlhf_viz::ppo::{token_loss, LossTotals, PpoHyperparams, TokenLossInput};
use rlhf_viz::prng::Prng;
use rlhf_viz::reward_model::{demo as reward_demo, RewardPair, RewardTrainer, EMBED_DIM};
use rlhf_viz::tokenizer::encode;

/// GAE over growing sequence lengths.
fn bench_gae(c: &mut Criterion) {
    let mut group = c.benchmark_group("gae");

    for len in [8usize, 64, 512, 4096].iter() {
        let mut rng = Prng::new(7);
        let policy: Vec<f64> = (0..*len).map(|_| -rng.gen_range_f64(0.1, 3.0)).collect();
        let reference: Vec<f64> = policy.iter().map(|p| p + rng.jitter(0.1)).collect();
        let values: Vec<f64> = (0..=*len).map(|i| i as f64 / *len as f64).collect();
        group.throughput(Throughput::Elements(*len as u64));

        group.bench_with_input(BenchmarkId::new("scores+gae", len), len, |b, _| {
            b.iter(|| {
                let scores = kl_penalized_scores(&policy, &reference, demo::KL_BETA, demo::REWARD).unwrap();
                black_box(compute_gae(&scores, &values, GaeParams::default()).unwrap())
            });
        });
    }

    group.finish();
}

/// Log-probs for a batch of logit rows at different vocabulary sizes.
fn bench_log_probs(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_probs");

    for vocab in [5usize, 256, 4096].iter() {
        let mut rng = Prng::new(11);
        let rows: Vec<Vec<f64>> = (0..32)
            .map(|_| (0..*vocab).map(|_| rng.gen_range_f64(-5.0, 5.0)).collect())
            .collect();
        let targets: Vec<usize> = (0..32).map(|_| rng.gen_range_usize(0, *vocab)).collect();
        group.throughput(Throughput::Elements((32 * vocab) as u64));

        group.bench_with_input(BenchmarkId::new("rows32", vocab), vocab, |b, _| {
            b.iter(|| black_box(sequence_log_probs(&rows, &targets).unwrap()));
        });
    }

    group.finish();
}

fn bench_padding(c: &mut Criterion) {
    let ids = encode(reward_demo::PROMPT);
    c.bench_function("pad_tokens/block128", |b| {
        b.iter(|| black_box(pad_tokens(black_box(&ids), 128, EOT_ID)))
    });
}

fn bench_reward(c: &mut Criterion) {
    c.bench_function("reward_pair/build48", |b| {
        b.iter(|| {
            black_box(RewardPair::build(
                reward_demo::PROMPT,
                reward_demo::CHOSEN,
                reward_demo::REJECTED,
                48,
            ))
        })
    });

    let pair = RewardPair::build(reward_demo::PROMPT, reward_demo::CHOSEN, reward_demo::REJECTED, 48);
    let chosen = pair.chosen.pooled(EMBED_DIM).unwrap().rep;
    let rejected = pair.rejected.pooled(EMBED_DIM).unwrap().rep;
    c.bench_function("reward_trainer/step", |b| {
        let mut trainer = RewardTrainer::new(EMBED_DIM, 0.5);
        b.iter(|| black_box(trainer.step(&chosen, &rejected).unwrap()))
    });
}

fn bench_ppo(c: &mut Criterion) {
    let mut rng = Prng::new(3);
    let inputs: Vec<TokenLossInput> = (0..1024)
        .map(|_| {
            let old = -rng.gen_range_f64(0.1, 3.0);
            TokenLossInput {
                old_log_prob: old,
                new_log_prob: old + rng.jitter(0.2),
                advantage: rng.gen_range_f64(-2.0, 2.0),
                ret: rng.gen_range_f64(0.0, 3.0),
                value: rng.gen_range_f64(0.0, 3.0),
                target_value: Some(rng.gen_range_f64(0.0, 3.0)),
            }
        })
        .collect();
    let hp = PpoHyperparams::default();

    let mut group = c.benchmark_group("ppo");
    group.throughput(Throughput::Elements(inputs.len() as u64));
    group.bench_function("token_loss/1024", |b| {
        b.iter(|| {
            let losses: Vec<_> = inputs.iter().map(|i| token_loss(i, &hp)).collect();
            black_box(losses.iter().collect::<LossTotals>())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_gae, bench_log_probs, bench_padding, bench_reward, bench_ppo);
criterion_main!(benches);
