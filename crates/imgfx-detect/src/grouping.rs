// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Optional grouping of overlapping detections.
//
// Windows are partitioned into clusters of "similar" boxes (corners within
// `eps` of the smaller box size), clusters with `min_neighbors` or fewer
// members are dropped, and each survivor is averaged into a single box.
// Small clusters nested inside a stronger cluster are dropped as well.

use imgfx_core::FaceBox;

/// Similarity tolerance, as a fraction of the smaller box size.
pub const GROUP_EPS: f64 = 0.2;

/// Merge overlapping boxes. Output boxes are clamped to a
/// `width` x `height` image and ordered by cluster discovery.
pub fn group_boxes(
    boxes: &[FaceBox],
    min_neighbors: u32,
    eps: f64,
    width: u32,
    height: u32,
) -> Vec<FaceBox> {
    if boxes.is_empty() {
        return Vec::new();
    }

    let labels = partition(boxes, eps);
    let clusters = labels.iter().copied().max().map_or(0, |max| max + 1);

    let mut sums = vec![[0u64; 4]; clusters];
    let mut counts = vec![0u32; clusters];
    for (face, &label) in boxes.iter().zip(&labels) {
        let sum = &mut sums[label];
        sum[0] += face.x as u64;
        sum[1] += face.y as u64;
        sum[2] += face.width as u64;
        sum[3] += face.height as u64;
        counts[label] += 1;
    }

    let averaged: Vec<(FaceBox, u32)> = sums
        .iter()
        .zip(&counts)
        .filter(|(_, count)| **count > min_neighbors)
        .map(|(sum, &count)| {
            let n = count as u64;
            let avg = |v: u64| ((v + n / 2) / n) as u32;
            (clamp_box(avg(sum[0]), avg(sum[1]), avg(sum[2]), avg(sum[3]), width, height), count)
        })
        .collect();

    averaged
        .iter()
        .enumerate()
        .filter(|(i, (inner, inner_count))| {
            !averaged.iter().enumerate().any(|(j, (outer, outer_count))| {
                *i != j
                    && nested(inner, outer, eps)
                    && (*outer_count > (*inner_count).max(3) || *inner_count < 3)
            })
        })
        .map(|(_, (face, _))| *face)
        .collect()
}

/// Assign a cluster label to every box (union-find over the similarity
/// relation). Labels are dense and ordered by first appearance.
fn partition(boxes: &[FaceBox], eps: f64) -> Vec<usize> {
    let mut parent: Vec<usize> = (0..boxes.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            if similar(&boxes[i], &boxes[j], eps) {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = rj.min(ri);
                }
            }
        }
    }

    let mut dense = vec![usize::MAX; boxes.len()];
    let mut next = 0;
    (0..boxes.len())
        .map(|i| {
            let r = root(&mut parent, i);
            if dense[r] == usize::MAX {
                dense[r] = next;
                next += 1;
            }
            dense[r]
        })
        .collect()
}

fn similar(a: &FaceBox, b: &FaceBox, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.right(), b.right())
        && close(a.bottom(), b.bottom())
}

/// True when `inner` sits inside `outer`, allowing a margin of `eps` times
/// the outer box size.
fn nested(inner: &FaceBox, outer: &FaceBox, eps: f64) -> bool {
    let dx = (outer.width as f64 * eps).round() as i64;
    let dy = (outer.height as f64 * eps).round() as i64;
    inner.x as i64 >= outer.x as i64 - dx
        && inner.y as i64 >= outer.y as i64 - dy
        && inner.right() as i64 <= outer.right() as i64 + dx
        && inner.bottom() as i64 <= outer.bottom() as i64 + dy
        && inner != outer
}

fn clamp_box(x: u32, y: u32, w: u32, h: u32, width: u32, height: u32) -> FaceBox {
    let x = x.min(width.saturating_sub(1));
    let y = y.min(height.saturating_sub(1));
    let w = w.clamp(1, (width - x).max(1));
    let h = h.clamp(1, (height - y).max(1));
    FaceBox::new(x, y, w, h)
}
