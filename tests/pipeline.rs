mod common;

use boxtree_pdf::extract::{SectionGeometry, extract};
use boxtree_pdf::model::{ComputedStyle, Display, PxRect, TextAlign};
use boxtree_pdf::sink::Op;
use boxtree_pdf::text::TextMeasure;
use boxtree_pdf::tree::BoxNode;
use boxtree_pdf::units::UnitConverter;
use boxtree_pdf::{Config, Converter, DocumentTree, ErrorCode, NoAssets, Progress, RecordingSink, Target};

use common::{Recorder, block, bordered, small_pages, style, text};

#[tokio::test]
async fn table_cells_take_the_uniform_border_path() {
    common::init_logging();
    let cell = |x: f32, label: &str| {
        BoxNode::element("td", PxRect::new(x, 0.0, 100.0, 30.0), bordered(Display::TableCell, 1.0))
            .child(text(x + 2.0, 5.0, 60.0, label))
    };
    let table = BoxNode::element("table", PxRect::new(0.0, 0.0, 200.0, 30.0), style(Display::Table)).child(
        BoxNode::element("tr", PxRect::new(0.0, 0.0, 200.0, 30.0), style(Display::TableRow))
            .child(cell(0.0, "left"))
            .child(cell(100.0, "right")),
    );
    let tree = DocumentTree::new(vec![block(0.0, 0.0, 200.0, 30.0).child(table)]);
    let geo = SectionGeometry {
        units: UnitConverter::natural(),
        origin_x: 0.0,
        origin_y: 0.0,
        margin_left: 40.0,
    };

    let out = extract(&tree, &tree.roots()[0], &Config::default(), geo, &NoAssets, 0).await;
    let borders: Vec<_> = out.items.iter().filter_map(|i| i.as_border()).collect();
    assert_eq!(borders.len(), 2);
    assert!(borders.iter().all(|b| b.uniform().is_some()));
}

#[tokio::test]
async fn forced_break_moves_content_to_next_page() {
    common::init_logging();
    let config = Config {
        page_break_selectors: vec![".page-break".into()],
        ..small_pages()
    };
    let root = block(0.0, 0.0, 280.0, 300.0)
        .child(block(0.0, 0.0, 280.0, 20.0).child(text(0.0, 0.0, 60.0, "before")))
        .child(
            block(0.0, 100.0, 280.0, 100.0)
                .with_class("page-break")
                .child(text(0.0, 150.0, 60.0, "after")),
        );
    let tree = DocumentTree::new(vec![root]);
    let targets = vec![Target::Node(tree.roots()[0])];

    let mut sink = RecordingSink::new();
    let report = Converter::new(config)
        .convert(&tree, &targets, &mut sink)
        .await
        .unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(sink.texts(0), vec!["before"]);
    assert_eq!(sink.texts(1), vec!["after"]);
    // offset 150 lands 50pt below the break: margin + 50
    let baseline = sink.pages()[1]
        .iter()
        .find_map(|op| match op {
            Op::Text { baseline, .. } => Some(*baseline),
            _ => None,
        })
        .unwrap();
    assert!(baseline > 60.0 && baseline < 60.0 + 19.2);
}

#[tokio::test]
async fn every_root_starts_a_fresh_page() {
    let tree = DocumentTree::new(vec![
        block(0.0, 0.0, 280.0, 40.0).child(text(0.0, 0.0, 60.0, "first")),
        block(0.0, 40.0, 280.0, 40.0).child(text(0.0, 40.0, 60.0, "second")),
    ]);
    let targets: Vec<_> = tree.roots().iter().copied().map(Target::Node).collect();
    let recorder = Recorder::default();
    let mut sink = RecordingSink::new();
    let report = Converter::new(small_pages())
        .with_observer(recorder.clone())
        .convert(&tree, &targets, &mut sink)
        .await
        .unwrap();

    assert_eq!(report.sections, 2);
    assert_eq!(sink.texts(0), vec!["first"]);
    assert_eq!(sink.texts(1), vec!["second"]);

    let progress = recorder.progress.borrow();
    assert_eq!(progress[0], Progress::SelectionDone { sections: 2 });
    assert!(matches!(progress[1], Progress::ElementParsed { section: 0, .. }));
    assert!(matches!(progress[2], Progress::ElementParsed { section: 1, .. }));
    assert_eq!(progress.last(), Some(&Progress::RenderDone { pages: 2 }));
}

#[tokio::test]
async fn missing_and_empty_targets_are_typed_errors() {
    let tree = DocumentTree::new(vec![
        block(0.0, 0.0, 280.0, 40.0).with_id("report"),
        block(0.0, 40.0, 280.0, 0.0).with_id("empty"),
    ]);
    let recorder = Recorder::default();
    let converter = Converter::new(small_pages()).with_observer(recorder.clone());
    let mut sink = RecordingSink::new();

    let err = converter
        .convert(&tree, &[Target::Selector("#nowhere".into())], &mut sink)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TargetNotFound);

    let err = converter
        .convert(&tree, &[Target::Selector("#empty".into())], &mut sink)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TargetZeroSize);
    assert_eq!(err.code().as_str(), "target-zero-size");

    assert_eq!(
        *recorder.errors.borrow(),
        vec![ErrorCode::TargetNotFound, ErrorCode::TargetZeroSize]
    );
    assert!(
        converter
            .convert(&tree, &[Target::Selector("#report".into())], &mut sink)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn json_tree_renders_backgrounds_below_text() {
    let json = r##"{
        "tag": "section",
        "rect": {"x": 0, "y": 0, "width": 280, "height": 60},
        "style": {"background_color": "#eeeeee"},
        "children": [
            {"tag": "h1", "rect": {"x": 0, "y": 0, "width": 280, "height": 30},
             "style": {"text_align": "center", "font_size": 20, "font_weight": 700},
             "children": [
                {"tag": "#text", "rect": {"x": 100, "y": 3, "width": 80, "height": 24},
                 "style": {"display": "inline", "font_size": 20, "font_weight": 700},
                 "content": {"type": "text", "text": "Quarterly   report"}}
             ]},
            {"tag": "p", "rect": {"x": 0, "y": 30, "width": 280, "height": 20},
             "style": {"display": "none"},
             "children": [
                {"tag": "#text", "rect": {"x": 0, "y": 30, "width": 80, "height": 20},
                 "style": {"display": "inline"},
                 "content": {"type": "text", "text": "hidden"}}
             ]}
        ]
    }"##;
    let tree = DocumentTree::from_json(json).unwrap();
    let targets = vec![Target::Node(tree.roots()[0])];
    let mut sink = RecordingSink::new();
    Converter::new(small_pages())
        .convert(&tree, &targets, &mut sink)
        .await
        .unwrap();

    let ops = &sink.pages()[0];
    assert!(matches!(ops[0], Op::FillRect { x, y, .. } if x == 10.0 && y == 10.0));
    assert_eq!(sink.texts(0), vec!["Quarterly report"]);
    match ops.iter().find(|op| matches!(op, Op::Text { .. })) {
        Some(Op::Text { style, .. }) => {
            assert!(style.bold);
            assert_eq!(style.font_size, 20.0);
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test]
async fn debug_overlay_outlines_boxes() {
    let config = Config {
        debug_overlay: true,
        ..small_pages()
    };
    let tree = DocumentTree::new(vec![block(0.0, 0.0, 280.0, 40.0).with_id("main")]);
    let targets = vec![Target::Node(tree.roots()[0])];
    let mut sink = RecordingSink::new();
    Converter::new(config).convert(&tree, &targets, &mut sink).await.unwrap();
    assert!(
        sink.pages()[0]
            .iter()
            .any(|op| matches!(op, Op::StrokeRect { .. }))
    );
    assert_eq!(sink.texts(0), vec!["div#main"]);
}

#[tokio::test]
async fn excluded_subtrees_are_not_drawn() {
    let config = Config {
        exclude_selectors: vec![".no-print".into(), "::bogus(".into()],
        ..small_pages()
    };
    let tree = DocumentTree::new(vec![
        block(0.0, 0.0, 280.0, 60.0)
            .child(block(0.0, 0.0, 280.0, 20.0).child(text(0.0, 0.0, 60.0, "kept")))
            .child(
                block(0.0, 20.0, 280.0, 20.0)
                    .with_class("no-print")
                    .child(text(0.0, 20.0, 60.0, "dropped")),
            ),
    ]);
    let targets = vec![Target::Node(tree.roots()[0])];
    let mut sink = RecordingSink::new();
    Converter::new(config).convert(&tree, &targets, &mut sink).await.unwrap();
    assert_eq!(sink.texts(0), vec!["kept"]);
    assert!(!sink.pages()[0].iter().any(|op| matches!(op, Op::FillRect { .. })));
}

#[tokio::test]
async fn centered_mixed_style_line_keeps_its_word_gap() {
    let centered = |display: Display, font_weight: u16| ComputedStyle {
        display,
        font_weight,
        text_align: TextAlign::Center,
        ..ComputedStyle::default()
    };
    let tree = DocumentTree::new(vec![
        BoxNode::element("div", PxRect::new(0.0, 0.0, 280.0, 40.0), centered(Display::Block, 400))
            .child(BoxNode::text(
                PxRect::new(110.0, 0.0, 45.0, 19.0),
                centered(Display::Inline, 400),
                "Total: ",
            ))
            .child(
                BoxNode::element("b", PxRect::new(155.0, 0.0, 10.0, 19.0), centered(Display::Inline, 700))
                    .child(BoxNode::text(
                        PxRect::new(155.0, 0.0, 10.0, 19.0),
                        centered(Display::Inline, 700),
                        "5",
                    )),
            ),
    ]);
    let targets = vec![Target::Node(tree.roots()[0])];
    let mut sink = RecordingSink::new();
    Converter::new(small_pages())
        .convert(&tree, &targets, &mut sink)
        .await
        .unwrap();

    let drawn: Vec<(String, f32, _)> = sink.pages()[0]
        .iter()
        .filter_map(|op| match op {
            Op::Text { text, x, style, .. } => Some((text.clone(), *x, style.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(drawn.len(), 2);
    let (label, label_x, label_style) = &drawn[0];
    let (value, value_x, value_style) = &drawn[1];
    assert_eq!(label, "Total:");
    assert_eq!(value, "5");

    let label_width = sink.measure("Total: ", label_style);
    assert!(label_width > sink.measure("Total:", label_style));
    assert!((value_x - (label_x + label_width)).abs() < 1e-3);

    let total = label_width + sink.measure("5", value_style);
    assert!((label_x - (10.0 + (280.0 - total) / 2.0)).abs() < 1e-3);
}
