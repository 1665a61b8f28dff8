use rt_whiteboard::sdk::ToolCommand;
use rt_whiteboard::whiteboard::{ChartType, Command, ContentKind, Span, Whiteboard};

fn run(board: &mut Whiteboard, name: &str, arguments: &str) {
    match ToolCommand::parse(name, arguments).expect("valid tool call") {
        ToolCommand::Whiteboard(command) => board.apply(&command),
        other => panic!("not a whiteboard command: {other:?}"),
    }
}

#[test]
fn clear_then_display_shows_only_the_new_slide() {
    let mut board = Whiteboard::new();
    run(&mut board, "display_content", r#"{"title":"Old","content":"stale"}"#);
    run(&mut board, "create_section", r#"{"section_title":"Older"}"#);

    run(&mut board, "clear_whiteboard", "{}");
    assert!(board.is_empty());
    assert_eq!(board.current_index(), None);
    assert!(board.render_current().is_none());

    run(
        &mut board,
        "display_content",
        r#"{"title":"Photosynthesis","content":"Plants turn **light** into sugar.","type":"bullet","items":["Light","Water"]}"#,
    );
    assert_eq!(board.len(), 1);
    assert_eq!(board.current_index(), Some(0));

    let slide = board.current().unwrap();
    assert_eq!(slide.title, "Photosynthesis");
    assert_eq!(slide.kind, ContentKind::List);
    assert_eq!(slide.items.as_deref(), Some(&["Light".to_string(), "Water".to_string()][..]));

    let rendered = board.render_current().unwrap();
    assert_eq!(rendered.items.len(), 2);
    assert_eq!(rendered.terms, vec!["photosynthesis"]);
    assert_eq!(rendered.title, vec![Span::Emphasis("Photosynthesis".to_string())]);
}

#[test]
fn clear_then_plain_text_display() {
    let mut board = Whiteboard::new();
    run(&mut board, "create_section", r#"{"section_title":"Earlier"}"#);

    run(&mut board, "clear_whiteboard", "{}");
    run(&mut board, "display_content", r#"{"title":"T","content":"C","type":"text"}"#);

    assert_eq!(board.len(), 1);
    let slide = board.current().unwrap();
    assert_eq!(slide.title, "T");
    assert_eq!(slide.body, "C");
    assert_eq!(slide.kind, ContentKind::Text);
    assert!(slide.chart.is_none());
    assert!(slide.items.is_none());
}

#[test]
fn every_display_command_adds_a_slide() {
    let mut board = Whiteboard::new();
    for i in 0..5 {
        run(&mut board, "add_content", &format!(r#"{{"title":"Point {i}","content":"Body {i}"}}"#));
    }
    run(
        &mut board,
        "display_data",
        r#"{"chart":"pie","title":"Budget","data":[{"label":"Rent","value":60},{"label":"Food","value":"40"}]}"#,
    );

    assert_eq!(board.len(), 6);
    assert_eq!(board.current_index(), Some(5));
    assert_eq!(board.slides()[3].body, "Body 3");

    let chart = board.current().unwrap().chart.clone().unwrap();
    assert_eq!(chart.chart_type, ChartType::Pie);
    assert!((chart.data[1].value - 40.0).abs() < f64::EPSILON);

    let rendered = board.render_current().unwrap();
    assert_eq!(rendered.kind, ContentKind::Chart);
    assert!(rendered.chart.is_some());
}

#[test]
fn navigation_is_clamped() {
    let mut board = Whiteboard::new();
    assert!(!board.next());
    assert!(!board.previous());
    assert_eq!(board.select(3), None);

    for title in ["A", "B", "C"] {
        board.apply(&Command::CreateSection(serde_json::from_value(serde_json::json!({"section_title": title})).unwrap()));
    }
    assert!(!board.next());
    assert_eq!(board.select(0), Some(0));
    assert!(!board.previous());
    assert!(board.next());
    assert_eq!(board.current().unwrap().title, "B");
    assert_eq!(board.select(99), Some(2));
}

#[test]
fn highlighting_is_idempotent_and_case_insensitive() {
    let mut board = Whiteboard::new();
    run(&mut board, "display_content", r#"{"title":"Cells","content":"The cell membrane protects the CELL."}"#);
    run(&mut board, "highlight_text", r#"{"text":"cell","terms":["Cell","membrane"]}"#);
    let once = board.render_current().unwrap();
    run(&mut board, "highlight_text", r#"{"text":"cell","terms":["Cell","membrane"]}"#);
    let twice = board.render_current().unwrap();

    assert_eq!(once, twice);
    assert_eq!(board.highlight().to_vec(), vec!["cell", "membrane"]);
    let emphasized: Vec<&str> = once
        .body
        .iter()
        .filter(|span| matches!(span, Span::Emphasis(_)))
        .map(Span::text)
        .collect();
    assert_eq!(emphasized, vec!["cell", "membrane", "CELL"]);
}
