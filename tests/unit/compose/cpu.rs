use std::path::PathBuf;

use super::*;
use crate::compose::plan::{SourceSize, TextDraw, plan_export};

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> PreparedImage {
    PreparedImage {
        width: w,
        height: h,
        rgba8_premul: Arc::new(rgba.repeat((w * h) as usize)),
    }
}

fn fixture_fonts() -> FontBook {
    let mut fonts = FontBook::default();
    fonts
        .load_font_file(
            &PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts/DejaVuSans-Bold.ttf"),
        )
        .unwrap();
    fonts
}

fn empty_plan(src: SourceSize, width: u32) -> ExportPlan {
    plan_export(src, &[], width, &mut FontBook::default()).unwrap()
}

fn pixel(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    [
        frame.data[i],
        frame.data[i + 1],
        frame.data[i + 2],
        frame.data[i + 3],
    ]
}

#[test]
fn base_image_is_scaled_to_the_plan_surface() {
    let base = solid(100, 50, [200, 10, 10, 255]);
    let plan = empty_plan(base.size(), 200);
    let mut raster = CpuRasterizer::new();

    let frame = raster
        .render(&plan, &base, &mut FontBook::default())
        .unwrap();
    assert_eq!((frame.width, frame.height), (200, 100));
    assert_eq!(frame.data.len(), 200 * 100 * 4);

    let center = pixel(&frame, 100, 50);
    assert_eq!(center[3], 255);
    assert!(center[0] >= 195 && center[1] <= 15, "center pixel {center:?}");
    assert_eq!(raster.last_stats(), RasterStats::default());
}

#[test]
fn text_without_fonts_is_unsupported() {
    let base = solid(10, 10, [0, 0, 0, 255]);
    let mut plan = empty_plan(base.size(), 10);
    plan.texts.push(TextDraw {
        layer_id: "c".to_string(),
        font_px: 12.0,
        line_pitch: 14.0,
        lines: vec![TextLine {
            text: "hi".to_string(),
            x: 0.0,
            y: 0.0,
        }],
    });

    let err = CpuRasterizer::new()
        .render(&plan, &base, &mut FontBook::default())
        .unwrap_err();
    assert!(matches!(err, MemecapError::UnsupportedEnvironment(_)));
}

#[test]
fn oversized_surface_is_unsupported() {
    let base = solid(2, 1, [0, 0, 0, 255]);
    let plan = empty_plan(base.size(), 70_000);
    let err = CpuRasterizer::new()
        .render(&plan, &base, &mut FontBook::default())
        .unwrap_err();
    assert!(matches!(err, MemecapError::UnsupportedEnvironment(_)));
}

#[test]
fn outlined_text_draws_white_and_black_pixels() {
    let mut fonts = fixture_fonts();

    let base = solid(200, 100, [40, 90, 160, 255]);
    let layers = vec![crate::model::layer::TextLayer::new(
        "c", "HELLO", 10.0, 20.0, 40.0,
    )];
    let plan = plan_export(base.size(), &layers, 200, &mut fonts).unwrap();
    let mut raster = CpuRasterizer::new();
    let frame = raster.render(&plan, &base, &mut fonts).unwrap();

    let mut white = 0;
    let mut black = 0;
    for px in frame.data.chunks_exact(4) {
        if px[0] > 240 && px[1] > 240 && px[2] > 240 {
            white += 1;
        }
        if px[0] < 15 && px[1] < 15 && px[2] < 15 {
            black += 1;
        }
    }
    assert!(white > 0, "no fill pixels");
    assert!(black > 0, "no outline pixels");
    assert_eq!(raster.last_stats().lines, 1);
    assert!(raster.last_stats().glyph_runs >= 1);
}

#[test]
fn fill_starts_at_the_layer_anchor() {
    let mut fonts = fixture_fonts();
    let base = solid(1000, 500, [40, 90, 160, 255]);
    let layers = vec![crate::model::layer::TextLayer::new(
        "c", "Hi there", 50.0, 50.0, 20.0,
    )];
    let plan = plan_export(base.size(), &layers, 1200, &mut fonts).unwrap();
    assert_eq!((plan.width, plan.height), (1200, 600));

    let frame = CpuRasterizer::new().render(&plan, &base, &mut fonts).unwrap();
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let px = pixel(&frame, x, y);
            if px[0] > 240 && px[1] > 240 && px[2] > 240 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
            }
        }
    }
    // Text hangs right of and below (600, 300).
    assert!((600..640).contains(&min_x), "first fill column {min_x}");
    assert!((300..330).contains(&min_y), "first fill row {min_y}");
}
