use abacus_core::{CostRegistry, Plan, RecordingPacer};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

fn generate_expression(operators: usize) -> String {
    let symbols = ['+', '-', '*', '/'];
    let mut text = String::from("1");
    for i in 0..operators {
        let symbol = symbols[i % symbols.len()];
        if i % 5 == 0 {
            text.push_str(&format!(" {symbol} ({} + 2)", i + 1));
        } else {
            text.push_str(&format!(" {symbol} {}", i + 1));
        }
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.measurement_time(Duration::from_secs(5));

    for size in [10, 100, 500].iter() {
        let text = generate_expression(*size);
        group.bench_with_input(BenchmarkId::new("parse_expression", size), &text, |b, text| {
            b.iter(|| black_box(Plan::parse(text).unwrap()))
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let costs = CostRegistry::default();

    for size in [10, 100, 500].iter() {
        let plan = Plan::parse(&generate_expression(*size)).unwrap();
        group.bench_with_input(BenchmarkId::new("evaluate_plan", size), &plan, |b, plan| {
            b.iter_batched(
                RecordingPacer::new,
                |pacer| black_box(plan.evaluate(&costs, &pacer)),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);
