use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgtpl::{DebugRenderer, Params, PgQuoter, Record, compile, expand, render_debug_query, reshape};

/// SELECT ... WHERE col0 = :p0 AND col1 = :p1 ... with `n` named values.
fn named_template(n: usize) -> (String, Params) {
    let mut sql = String::from("SELECT * FROM t WHERE ");
    for i in 0..n {
        if i > 0 {
            sql.push_str(" AND ");
        }
        sql.push_str(&format!("col{i} = :p{i}"));
    }
    let params = Params::named((0..n).map(|i| (format!("p{i}"), format!("value {i}"))));
    (sql, params)
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/plain");

    for n in [1, 5, 10, 50] {
        let input = named_template(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, (sql, params)| {
            b.iter(|| black_box(render_debug_query(sql, params, None)));
        });
    }

    group.finish();
}

fn bench_render_error(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/error");
    let renderer = DebugRenderer::new(PgQuoter);

    for n in [1, 5, 10, 50] {
        let input = named_template(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, (sql, params)| {
            b.iter(|| {
                black_box(renderer.render(
                    sql,
                    params,
                    Some("syntax error at or near \"col0\" at character 23"),
                ))
            });
        });
    }

    group.finish();
}

fn bench_expand_and_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand/in_list");

    for n in [5, 20, 100, 500] {
        let params = Params::named([("ids", (0..n).collect::<Vec<i64>>())]);
        group.bench_with_input(BenchmarkId::from_parameter(n), &params, |b, params| {
            b.iter(|| {
                let (sql, params) = expand("SELECT * FROM t WHERE id IN (:ids)", params)
                    .expect("expand");
                black_box(compile(&sql, &params))
            });
        });
    }

    group.finish();
}

fn bench_reshape(c: &mut Criterion) {
    let mut group = c.benchmark_group("reshape");
    let kinds = ["fruit", "mammal", "bird"];

    for n in [10, 100, 1000] {
        let rows: Vec<Record> = (0..n)
            .map(|i| {
                Record::new()
                    .with("id", i % 10)
                    .with("type", kinds[i as usize % kinds.len()])
                    .with("value", format!("v{i}"))
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| black_box(reshape(rows.iter(), "id[type][]=>*", false)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_render,
    bench_render_error,
    bench_expand_and_compile,
    bench_reshape
);
criterion_main!(benches);
