use criterion::{criterion_group, criterion_main, Criterion};
use giveaway::{draw, GiveawayEntry, RngSource};

fn bench_draw(c: &mut Criterion) {
    let entries: Vec<GiveawayEntry> = (0..5_000u64)
        .map(|user_id| GiveawayEntry {
            user_id,
            invites: user_id % 7,
            bot_uses: user_id % 300,
            chance: (user_id % 7) as f64 * 3.0 + (user_id % 300) as f64 * 0.05,
            forced: false,
            pinned: false,
        })
        .collect();
    let mut source = RngSource::seeded(42);
    c.bench_function("weighted_draw_5k", |b| {
        b.iter(|| {
            let _ = draw(&entries, &mut source);
        })
    });
}

criterion_group!(benches, bench_draw);
criterion_main!(benches);
