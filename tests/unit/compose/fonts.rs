use super::*;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts")
}

#[test]
fn empty_book_cannot_shape() {
    let mut book = FontBook::default();
    assert!(!book.has_faces());
    assert!(book.primary_family().is_none());
    let Err(err) = book.layout_line("hi", 20.0) else {
        panic!("shaping without faces should fail");
    };
    assert!(matches!(err, MemecapError::UnsupportedEnvironment(_)));
}

#[test]
fn garbage_bytes_register_nothing() {
    let mut book = FontBook::default();
    assert!(book.register_font_bytes(b"not a font".to_vec()).is_err());
    assert!(!book.has_faces());
}

#[test]
fn preferred_font_files_sort_first() {
    let book = FontBook::new(vec!["Impact".to_string(), "DejaVu Sans".to_string()]);
    assert_eq!(book.preference_rank(Path::new("/f/impact.ttf")), 0);
    assert_eq!(book.preference_rank(Path::new("/f/DejaVuSans-Bold.ttf")), 1);
    assert_eq!(book.preference_rank(Path::new("/f/Other.ttf")), 2);
}

#[test]
fn missing_dirs_yield_an_empty_book() {
    let book = FontBook::from_dirs(&[PathBuf::from("/nonexistent/memecap/fonts")], vec![]);
    assert!(!book.has_faces());
}

#[test]
fn measures_with_the_fixture_font() {
    let mut book = FontBook::default();
    let names = book
        .load_font_file(&fixture_dir().join("DejaVuSans-Bold.ttf"))
        .unwrap();
    assert!(names.iter().any(|n| n == "DejaVu Sans"), "{names:?}");
    assert_eq!(book.primary_family(), Some("DejaVu Sans"));

    let short = book.measure("Hi", 24.0).unwrap();
    let long = book.measure("Hi there, friend", 24.0).unwrap();
    assert!(short > 0.0);
    assert!(long > short);
    assert!(book.measure("Hi", 48.0).unwrap() > short);
}

#[test]
fn directory_scan_finds_the_fixture_and_honours_preference() {
    let book = FontBook::from_dirs(
        &[fixture_dir()],
        vec!["Impact".to_string(), "DejaVu Sans".to_string()],
    );
    assert!(book.has_faces());
    assert_eq!(book.families(), ["DejaVu Sans".to_string()]);
    assert_eq!(book.primary_family(), Some("DejaVu Sans"));
}
