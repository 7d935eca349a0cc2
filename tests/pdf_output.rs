mod common;

use boxtree_pdf::{Config, Converter, DocumentTree, ErrorCode, Target, convert_json_file};

use common::{PixelRasterizer, Recorder, block, count, image, small_pages, text};

#[tokio::test]
async fn forced_breaks_produce_pages_in_the_pdf() {
    common::init_logging();
    let config = Config {
        page_break_selectors: vec![".chapter".into()],
        ..small_pages()
    };
    let root = block(0.0, 0.0, 280.0, 300.0)
        .child(block(0.0, 0.0, 280.0, 20.0).child(text(0.0, 0.0, 80.0, "Preface")))
        .child(
            block(0.0, 50.0, 280.0, 20.0)
                .with_class("chapter")
                .child(text(0.0, 50.0, 80.0, "One")),
        )
        .child(
            block(0.0, 100.0, 280.0, 20.0)
                .with_class("chapter")
                .child(text(0.0, 100.0, 80.0, "Two"))
                .child(image(100.0, 100.0, 20.0, 20.0, "logo.png")),
        );
    let tree = DocumentTree::new(vec![root]);
    let targets = vec![Target::Node(tree.roots()[0])];

    let pdf = Converter::new(config)
        .with_rasterizer(PixelRasterizer)
        .convert_to_pdf(&tree, &targets)
        .await
        .unwrap();

    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(count(&pdf, b"/Count 3"), 1);
    assert_eq!(count(&pdf, b"/MediaBox [0 0 300 220]"), 3);
    assert_eq!(count(&pdf, b"/Subtype /Image"), 1);
    assert_eq!(count(&pdf, b"/WinAnsiEncoding"), 1);
}

#[tokio::test]
async fn json_file_round_trip_writes_a_pdf() {
    common::init_logging();
    let dir = std::env::temp_dir().join(format!("boxtree-pdf-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("tree.json");
    let output = dir.join("out.pdf");
    std::fs::write(
        &input,
        r##"[
            {"tag": "body", "rect": {"x": 0, "y": 0, "width": 500, "height": 40},
             "children": [{"tag": "#text", "rect": {"x": 0, "y": 0, "width": 90, "height": 20},
                           "style": {"display": "inline"},
                           "content": {"type": "text", "text": "Hello PDF"}}]},
            {"tag": "body", "rect": {"x": 0, "y": 40, "width": 500, "height": 40}}
        ]"##,
    )
    .unwrap();

    convert_json_file(&Converter::new(Config::default()), &input, &output)
        .await
        .unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(count(&pdf, b"/Count 2"), 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unreadable_input_is_reported_as_generation_failed() {
    let recorder = Recorder::default();
    let converter = Converter::new(Config::default()).with_observer(recorder.clone());
    let err = convert_json_file(
        &converter,
        std::path::Path::new("/nonexistent/tree.json"),
        std::path::Path::new("/nonexistent/out.pdf"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::GenerationFailed);
    assert_eq!(*recorder.errors.borrow(), vec![ErrorCode::GenerationFailed]);
}

#[tokio::test]
async fn malformed_json_is_reported() {
    let dir = std::env::temp_dir().join(format!("boxtree-pdf-bad-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("tree.json");
    std::fs::write(&input, "{\"tag\": ").unwrap();

    let recorder = Recorder::default();
    let converter = Converter::new(Config::default()).with_observer(recorder.clone());
    let err = convert_json_file(&converter, &input, &dir.join("out.pdf"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::GenerationFailed);
    assert_eq!(recorder.errors.borrow().len(), 1);
    assert!(!dir.join("out.pdf").exists());
    let _ = std::fs::remove_dir_all(&dir);
}
