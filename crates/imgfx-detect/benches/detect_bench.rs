// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the sliding-window scan and annotation on a
// 320x240 synthetic scene with a two-stage 24x24 cascade.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use imgfx_core::{AnnotationSettings, DetectorSettings, PixelGrid};
use imgfx_detect::cascade::{Feature, Stage, WeakClassifier, WeightedRect};
use imgfx_detect::{ClassifierModel, FaceDetector, IntegralImage, annotate};

fn rect(x: u32, y: u32, width: u32, height: u32, weight: f32) -> WeightedRect {
    WeightedRect {
        x,
        y,
        width,
        height,
        weight,
    }
}

fn model() -> ClassifierModel {
    ClassifierModel {
        width: 24,
        height: 24,
        features: vec![
            // Dark band over bright band.
            Feature {
                rects: vec![rect(0, 0, 24, 12, -1.0), rect(0, 12, 24, 12, 1.0)],
            },
            // Bright centre column.
            Feature {
                rects: vec![rect(0, 0, 24, 24, -1.0), rect(8, 0, 8, 24, 3.0)],
            },
        ],
        stages: vec![
            Stage {
                threshold: 0.0,
                weak_classifiers: vec![WeakClassifier {
                    feature: 0,
                    threshold: 0.3,
                    left: -1.0,
                    right: 1.0,
                }],
            },
            Stage {
                threshold: 0.0,
                weak_classifiers: vec![WeakClassifier {
                    feature: 1,
                    threshold: 0.1,
                    left: -1.0,
                    right: 1.0,
                }],
            },
        ],
    }
}

fn scene(width: u32, height: u32) -> PixelGrid {
    let mut grid = PixelGrid::uniform_gray(width, height, 128);
    for y in 0..height {
        for x in 0..width {
            let v = ((x * 7 + y * 13) ^ (x * y)) % 256;
            grid.put_pixel(x, y, &[v as u8]);
        }
    }
    grid
}

fn bench_detect(c: &mut Criterion) {
    let grid = scene(320, 240);
    let detector = FaceDetector::new(Arc::new(model()), DetectorSettings::default());

    c.bench_function("integral image (320x240)", |b| {
        b.iter(|| black_box(IntegralImage::new(black_box(&grid))));
    });
    c.bench_function("detect 24x24 cascade (320x240)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&grid))));
    });

    let faces = detector.detect(&grid).unwrap_or_default();
    let settings = AnnotationSettings::default();
    c.bench_function("annotate detections (320x240)", |b| {
        b.iter(|| black_box(annotate(black_box(&grid), &faces, &settings)));
    });
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
