// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Full request path: validation, decoding, effect, encoding and storage,
// against a temporary upload directory and a small synthetic cascade.

use std::path::Path;

use imgfx_core::{AppConfig, Channels, CoreError, FaceBox, ImageFormat, PixelGrid, UploadRequest};
use imgfx_imaging::{decode, encode};
use imgfx_service::EffectService;
use tempfile::TempDir;

/// 8x8 cascade with a single "dark top half, bright bottom half" feature.
const EDGE_CASCADE: &str = r#"{
  "width": 8,
  "height": 8,
  "features": [
    { "rects": [
      { "x": 0, "y": 0, "width": 8, "height": 4, "weight": -1.0 },
      { "x": 0, "y": 4, "width": 8, "height": 4, "weight": 1.0 }
    ] }
  ],
  "stages": [
    { "threshold": 0.0,
      "weak_classifiers": [ { "feature": 0, "threshold": 0.5, "left": -1.0, "right": 1.0 } ] }
  ]
}"#;

struct Fixture {
    dir: TempDir,
    service: EffectService,
}

impl Fixture {
    fn new() -> Self {
        Self::with(|_| {})
    }

    fn with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = dir.path().join("cascade.json");
        std::fs::write(&model, EDGE_CASCADE).expect("write cascade");

        let mut config = AppConfig {
            upload_dir: dir.path().join("static").join("uploads"),
            classifier_path: model,
            ..AppConfig::default()
        };
        tweak(&mut config);
        let service = EffectService::init(config).expect("service starts");
        Self { dir, service }
    }

    fn upload_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("static").join("uploads")
    }

    fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.upload_dir())
            .expect("upload dir exists")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn gradient(width: u32, height: u32) -> PixelGrid {
    let mut grid = PixelGrid::blank(width, height, Channels::Rgb).expect("grid");
    for y in 0..height {
        for x in 0..width {
            grid.put_pixel(x, y, &[(x * 2) as u8, (y * 2) as u8, ((x + y) % 256) as u8]);
        }
    }
    grid
}

fn decode_file(path: &Path, extension: &str) -> PixelGrid {
    decode(&std::fs::read(path).expect("read asset"), extension).expect("decode asset")
}

#[test]
fn rotate_png_end_to_end() {
    let fx = Fixture::new();
    let input = gradient(100, 100);
    let bytes = encode(&input, ImageFormat::Png).unwrap();

    let result = fx
        .service
        .process_upload(UploadRequest::new(bytes.clone(), "photo.png", "rotate"))
        .unwrap();

    assert_eq!(result.original.path, fx.upload_dir().join("photo.png"));
    assert_eq!(result.processed.path, fx.upload_dir().join("processed_photo.png"));
    assert_eq!(std::fs::read(&result.original.path).unwrap(), bytes);

    let rotated = decode_file(&result.processed.path, "png");
    assert_eq!(rotated.dimensions(), (100, 100));
    assert_eq!(rotated.pixel(0, 0), input.pixel(0, 99));
    assert_eq!(rotated.pixel(99, 0), input.pixel(0, 0));
}

#[test]
fn unknown_effect_persists_nothing() {
    let fx = Fixture::new();
    let bytes = encode(&gradient(10, 10), ImageFormat::Png).unwrap();

    let err = fx
        .service
        .process_upload(UploadRequest::new(bytes, "photo.png", "sepia"))
        .unwrap_err();

    assert!(matches!(err, CoreError::UnknownEffect(ref name) if name == "sepia"), "{err}");
    assert!(fx.stored_files().is_empty());
}

#[test]
fn validation_failures() {
    let fx = Fixture::new();
    let png = encode(&gradient(4, 4), ImageFormat::Png).unwrap();

    let err = fx
        .service
        .process_upload(UploadRequest::new(png.clone(), "anim.gif", "blur"))
        .unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedType(_)), "{err}");

    let err = fx
        .service
        .process_upload(UploadRequest::new(png, "", "blur"))
        .unwrap_err();
    assert!(matches!(err, CoreError::NoFile), "{err}");

    let six_mib = vec![0u8; 6 * 1024 * 1024];
    let err = fx
        .service
        .process_upload(UploadRequest::new(six_mib, "huge.jpg", "blur"))
        .unwrap_err();
    assert!(
        matches!(
            err,
            CoreError::TooLarge { size, limit }
                if size == 6 * 1024 * 1024 && limit == 5 * 1024 * 1024
        ),
        "{err}"
    );

    assert!(fx.stored_files().is_empty());
}

#[test]
fn corrupt_upload_persists_nothing() {
    let fx = Fixture::new();
    let err = fx
        .service
        .process_upload(UploadRequest::new(b"\x89PNG garbage".to_vec(), "broken.png", "mirror"))
        .unwrap_err();
    assert!(matches!(err, CoreError::CorruptData(_)), "{err}");
    assert!(fx.stored_files().is_empty());
}

#[test]
fn jpeg_upload_keeps_jpeg_output_and_sanitised_name() {
    let fx = Fixture::new();
    let jpeg = encode(&gradient(64, 48), ImageFormat::Jpeg).unwrap();

    let result = fx
        .service
        .process_upload(UploadRequest::new(jpeg, "../My Holiday.JPG", "grayscale"))
        .unwrap();

    assert_eq!(result.original.id.as_str(), "My_Holiday.JPG");
    assert_eq!(fx.stored_files(), vec!["My_Holiday.JPG", "processed_My_Holiday.JPG"]);

    let processed = std::fs::read(&result.processed.path).unwrap();
    assert_eq!(&processed[..2], &[0xFF, 0xD8]);
    let gray = decode(&processed, "jpg").unwrap();
    assert_eq!(gray.channels(), Channels::Gray);
    assert_eq!(gray.dimensions(), (64, 48));
}

#[test]
fn face_detect_annotates_matches() {
    let fx = Fixture::new();
    let mut scene = PixelGrid::uniform_rgb(40, 40, [128, 128, 128]);
    for y in 10..18 {
        for x in 10..18 {
            let v = if y < 14 { 0 } else { 255 };
            scene.put_pixel(x, y, &[v, v, v]);
        }
    }
    let bytes = encode(&scene, ImageFormat::Png).unwrap();

    let result = fx
        .service
        .process_upload(UploadRequest::new(bytes, "portrait.png", "face_detect"))
        .unwrap();

    assert!(result.faces.contains(&FaceBox::new(10, 10, 8, 8)), "{:?}", result.faces);
    assert!(result.faces.iter().all(|f| f.fits_within(40, 40)));

    let annotated = decode_file(&result.processed.path, "png");
    assert_eq!(annotated.channels(), Channels::Rgb);
    assert_eq!(annotated.pixel(10, 10), &[0, 255, 0]);
    // Strokes stay inside the detected boxes.
    for y in 0..40 {
        for x in 0..40 {
            let covered = result
                .faces
                .iter()
                .any(|f| (f.x..f.right()).contains(&x) && (f.y..f.bottom()).contains(&y));
            if !covered {
                assert_eq!(annotated.pixel(x, y), scene.pixel(x, y), "({x}, {y})");
            }
        }
    }
}

#[test]
fn face_detect_on_blank_image_is_not_an_error() {
    let fx = Fixture::new();
    let bytes = encode(&PixelGrid::uniform_gray(32, 32, 200), ImageFormat::Png).unwrap();

    let result = fx
        .service
        .process_upload(UploadRequest::new(bytes, "wall.png", "face_detect"))
        .unwrap();
    assert!(result.faces.is_empty());

    // The gray upload is promoted so annotations could be coloured.
    let processed = decode_file(&result.processed.path, "png");
    assert_eq!(processed.channels(), Channels::Rgb);
}

#[test]
fn configured_limit_applies() {
    let fx = Fixture::with(|config| config.max_upload_bytes = 64);
    let bytes = encode(&gradient(50, 50), ImageFormat::Png).unwrap();
    assert!(bytes.len() > 64);

    let err = fx
        .service
        .process_upload(UploadRequest::new(bytes, "a.png", "blur"))
        .unwrap_err();
    assert!(matches!(err, CoreError::TooLarge { limit: 64, .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_with_the_same_name() {
    let fx = Fixture::new();
    let effects = ["grayscale", "blur", "rotate", "mirror"];

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let service = fx.service.clone();
            let bytes = encode(&gradient(30 + i, 20), ImageFormat::Png).unwrap();
            let effect = effects[i as usize % effects.len()];
            tokio::spawn(async move {
                service
                    .process_upload_blocking(UploadRequest::new(bytes, "same.png", effect))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.expect("task joined").expect("upload succeeds");
    }

    // Collisions overwrite; whichever request won, both files are whole.
    assert_eq!(fx.stored_files(), vec!["processed_same.png", "same.png"]);
    decode_file(&fx.upload_dir().join("same.png"), "png");
    decode_file(&fx.upload_dir().join("processed_same.png"), "png");
}
