// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use thelma_racks::{PositionOrder, RackShape};
use thelma_sectors::{RackSectorTranslator, TranslationBehaviour, sector_positions};

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    let behaviours = [
        ("many_to_one", 0, 3, TranslationBehaviour::ManyToOne, RackShape::SHAPE_96),
        ("one_to_many", 3, 0, TranslationBehaviour::OneToMany, RackShape::SHAPE_384),
        ("many_to_many", 1, 2, TranslationBehaviour::ManyToMany, RackShape::SHAPE_384),
    ];
    for (name, source, target, behaviour, shape) in behaviours {
        let translator = RackSectorTranslator::new(4, source, target, Some(behaviour)).unwrap();
        let positions: Vec<_> = shape.positions(PositionOrder::RowMajor).collect();
        group.bench_with_input(BenchmarkId::new(name, shape.size()), &positions, |b, positions| {
            b.iter(|| {
                for position in positions {
                    let _ = black_box(translator.translate(*position));
                }
            });
        });
    }
    group.finish();
}

fn bench_sector_positions(c: &mut Criterion) {
    c.bench_function("sector_positions_384", |b| {
        b.iter(|| {
            for sector in 0..4 {
                black_box(sector_positions(sector, RackShape::SHAPE_384, 4).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_translate, bench_sector_positions);
criterion_main!(benches);
