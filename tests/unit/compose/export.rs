use super::*;

fn frame(w: u32, h: u32, px: [u8; 4], premultiplied: bool) -> FrameRGBA {
    FrameRGBA {
        width: w,
        height: h,
        data: px.repeat((w * h) as usize),
        premultiplied,
    }
}

#[test]
fn encoded_png_keeps_dimensions() {
    let img = ExportedImage::from_frame(&frame(7, 3, [1, 2, 3, 255], true)).unwrap();
    assert_eq!((img.width, img.height), (7, 3));
    assert_eq!(ExportedImage::decoded_dimensions(&img.png).unwrap(), (7, 3));

    let decoded = image::load_from_memory(&img.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (7, 3));
}

#[test]
fn premultiplied_frames_are_unpremultiplied() {
    let img = ExportedImage::from_frame(&frame(1, 1, [64, 0, 32, 128], true)).unwrap();
    let px = image::load_from_memory(&img.png).unwrap().to_rgba8();
    let p = px.get_pixel(0, 0).0;
    assert_eq!(p[3], 128);
    assert_eq!(p[0], 128);
    assert_eq!(p[2], 64);
}

#[test]
fn mismatched_frame_is_rejected() {
    let mut f = frame(2, 2, [0, 0, 0, 255], false);
    f.data.pop();
    assert!(ExportedImage::from_frame(&f).is_err());
}

#[test]
fn save_creates_directory_and_rejects_paths() {
    let dir = tempfile::tempdir().unwrap();
    let img = ExportedImage::from_frame(&frame(2, 2, [9, 9, 9, 255], false)).unwrap();

    let out = img.save(&dir.path().join("nested"), "meme.png").unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), img.png);

    assert!(img.save(dir.path(), "../escape.png").is_err());
    assert!(img.save(dir.path(), "").is_err());
}

#[test]
fn garbage_has_no_png_dimensions() {
    assert!(ExportedImage::decoded_dimensions(b"nope").is_err());
}
