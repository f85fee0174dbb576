//! Pipeline throughput: CSV parsing, aggregation, scale lookups and element
//! building on synthetic escape tables.

#![allow(missing_docs)]

use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use residue_overlay::aggregate::{aggregate, process_residue_data, ColumnKey};
use residue_overlay::element::{build_many_elements, ResidueTable};
use residue_overlay::ingest::{Delimiters, RowSet};
use residue_overlay::scale::{rgb_from_u32, ColorScale, ScaleConfig, DEFAULT_GRAY};
use rustc_hash::FxHashMap;

const CONDITIONS: [&str; 3] = ["REGN10987", "LY-CoV016", "S309"];

/// Synthetic escape table: `residues` sites on two chains of two models,
/// measured under every condition.
fn escape_csv(residues: usize) -> String {
    let mut csv = String::from("residue,chain,model,condition,escape,site\n");
    for condition in CONDITIONS {
        for r in 0..residues {
            let escape = (r * 37 % 100) as f64 / 100.0;
            let _ = writeln!(
                csv,
                "{},A;B:C,6XR8:6XRA,{condition},{escape},s{}",
                r + 1,
                r % 7
            );
        }
    }
    csv
}

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for count in [100, 1000, 5000] {
        let csv = escape_csv(count);
        group.bench_function(format!("{count}_residues"), |b| {
            b.iter(|| black_box(RowSet::parse(black_box(&csv))));
        });
    }
    group.finish();
}

fn aggregate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    for count in [100, 1000, 5000] {
        let Ok(rows) = RowSet::parse(&escape_csv(count)) else {
            continue;
        };
        group.bench_function(format!("{count}_residues"), |b| {
            b.iter(|| black_box(aggregate(&rows, "escape", Some("S309"))));
        });
    }
    group.finish();
}

fn scale_benchmark(c: &mut Criterion) {
    let Ok(rows) = RowSet::parse(&escape_csv(1000)) else {
        return;
    };
    let Ok(entries) = aggregate(&rows, "escape", Some("S309")) else {
        return;
    };
    let scale = ColorScale::for_entries(&entries, &ScaleConfig::diverging());
    c.bench_function("diverging_color_1000", |b| {
        b.iter(|| {
            for entry in &entries {
                let _ = black_box(scale.color(&entry.value));
            }
        });
    });
}

fn element_benchmark(c: &mut Criterion) {
    let Ok(rows) = RowSet::parse(&escape_csv(1000)) else {
        return;
    };
    let keys: Vec<ColumnKey> = CONDITIONS
        .iter()
        .map(|cond| ColumnKey::with_condition("escape", *cond))
        .collect();
    let Ok(data) = process_residue_data(&rows, &keys) else {
        return;
    };
    let configs = FxHashMap::default();
    c.bench_function("build_three_elements", |b| {
        b.iter(|| {
            black_box(build_many_elements(
                &data,
                &configs,
                rgb_from_u32(DEFAULT_GRAY),
                Delimiters::default(),
            ))
        });
    });

    let Ok(elements) = build_many_elements(
        &data,
        &configs,
        rgb_from_u32(DEFAULT_GRAY),
        Delimiters::default(),
    ) else {
        return;
    };
    let mut structure = ResidueTable::new("6XR8");
    for r in 1..=1000 {
        structure.push_residue("A", r, 8);
        structure.push_residue("B", r, 8);
    }
    c.bench_function("atom_values_16k_atoms", |b| {
        b.iter(|| black_box(elements[0].atom_values(&structure)));
    });
}

criterion_group!(
    benches,
    parse_benchmark,
    aggregate_benchmark,
    scale_benchmark,
    element_benchmark
);
criterion_main!(benches);
