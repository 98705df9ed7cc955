use super::*;

struct CountingMeasure {
    calls: usize,
}

impl TextMeasure for CountingMeasure {
    fn measure(&mut self, text: &str, font_px: f32) -> MemecapResult<f32> {
        self.calls += 1;
        Ok(text.chars().count() as f32 * font_px * 0.6)
    }
}

fn measure() -> CountingMeasure {
    CountingMeasure { calls: 0 }
}

const SRC: SourceSize = SourceSize {
    width: 1000,
    height: 500,
};

#[test]
fn scenario_hi_at_center() {
    let layers = vec![TextLayer::new("c", "Hi", 50.0, 50.0, 20.0)];
    let plan = plan_export(SRC, &layers, 1200, &mut measure()).unwrap();

    assert_eq!((plan.width, plan.height), (1200, 600));
    assert_eq!(plan.texts.len(), 1);
    let t = &plan.texts[0];
    assert_eq!(t.font_px, 24.0);
    assert_eq!(t.line_pitch, 29.0);
    assert_eq!(t.lines.len(), 1);
    assert_eq!((t.lines[0].x, t.lines[0].y), (600.0, 300.0));
}

#[test]
fn height_preserves_aspect_ratio_with_rounding() {
    let cases = [
        (SourceSize { width: 1000, height: 500 }, 1200, 600),
        (SourceSize { width: 3, height: 2 }, 100, 67),
        (SourceSize { width: 640, height: 480 }, 333, 250),
        (SourceSize { width: 500, height: 1000 }, 250, 500),
    ];
    for (src, w, expected) in cases {
        assert_eq!(output_height(src, w).unwrap(), expected, "{src:?} @ {w}");
    }
}

#[test]
fn blank_layers_produce_no_draws_and_no_measurement() {
    let layers = vec![
        TextLayer::new("a", "", 10.0, 10.0, 20.0),
        TextLayer::new("b", "   \t", 10.0, 10.0, 20.0),
    ];
    let mut m = measure();
    let plan = plan_export(SRC, &layers, 1200, &mut m).unwrap();
    assert!(plan.texts.is_empty());
    assert_eq!(m.calls, 0);
}

#[test]
fn font_and_stroke_have_floors() {
    assert_eq!(scaled_font_px(4.0, 0.5), MIN_FONT_PX);
    assert_eq!(scaled_font_px(40.0, 0.5), 20.0);
    assert_eq!(scaled_stroke_px(0.1), MIN_STROKE_PX);
    assert_eq!(scaled_stroke_px(2.0), 8.0);
}

#[test]
fn wrapped_lines_advance_by_pitch() {
    let text = "this caption is long enough that it has to wrap onto several lines";
    let layers = vec![TextLayer::new("c", text, 0.0, 10.0, 40.0)];
    let plan = plan_export(SRC, &layers, 400, &mut measure()).unwrap();

    let t = &plan.texts[0];
    assert!(t.lines.len() > 1);
    for pair in t.lines.windows(2) {
        assert_eq!(pair[1].y - pair[0].y, t.line_pitch);
    }
    assert_eq!(plan.max_line_width, 360.0);
}

#[test]
fn layers_are_planned_in_order() {
    let layers = vec![
        TextLayer::new("top", "top text", 5.0, 5.0, 30.0),
        TextLayer::new("skip", "", 5.0, 5.0, 30.0),
        TextLayer::new("bottom", "bottom text", 5.0, 80.0, 30.0),
    ];
    let plan = plan_export(SRC, &layers, 1000, &mut measure()).unwrap();
    let ids: Vec<_> = plan.texts.iter().map(|t| t.layer_id.as_str()).collect();
    assert_eq!(ids, ["top", "bottom"]);
}

#[test]
fn zero_sizes_are_rejected() {
    let zero_src = SourceSize {
        width: 0,
        height: 10,
    };
    assert!(matches!(
        output_height(zero_src, 100),
        Err(MemecapError::ImageLoad(_))
    ));
    assert!(matches!(
        output_height(SRC, 0),
        Err(MemecapError::Validation(_))
    ));
}
