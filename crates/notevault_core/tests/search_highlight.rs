use notevault_core::search::extract::extract_text;
use notevault_core::search::highlight::{strip_highlight_markers, HighlightController};
use notevault_core::search::matcher::{find_matches, MatchOptions, CONTEXT_RADIUS};
use notevault_core::search::surface::{EditorSurface, MemorySurface};

const PAGE: &str = concat!(
    r#"<h1>Trip <em>planning</em></h1>"#,
    r#"<p>Pack the <strong>world</strong> map and a <a href="https://world.example">link</a>.</p>"#,
    r#"<div class="link-preview"><span>World Travel Blog</span></div>"#,
    r#"<img src="data:image/png;base64,d29ybGQ=" alt="world">"#,
    r#"<ul><li>passport</li><li>tickets</li></ul>"#,
    r#"<script>var world = 1;</script>"#,
    r#"<p style="display: none">hidden world</p>"#,
);

#[test]
fn extraction_is_clean_and_ordered() {
    let text = extract_text(Some("  Summer  "), PAGE);
    assert_eq!(
        text,
        "Summer Trip planning Pack the world map and a link. passport tickets"
    );
}

#[test]
fn hello_world_offsets_follow_case_option() {
    let text = extract_text(None, "<p>Hello world hello World</p>");
    assert_eq!(text, "Hello world hello World");

    let insensitive = find_matches(&text, "world", MatchOptions::default());
    let offsets: Vec<usize> = insensitive.iter().map(|hit| hit.absolute_index).collect();
    assert_eq!(offsets, vec![6, 18]);

    let sensitive = find_matches(
        &text,
        "world",
        MatchOptions {
            case_sensitive: true,
            whole_words: false,
        },
    );
    let offsets: Vec<usize> = sensitive.iter().map(|hit| hit.absolute_index).collect();
    assert_eq!(offsets, vec![6]);
}

#[test]
fn context_windows_stay_bounded() {
    let body = "lorem ipsum dolor sit amet ".repeat(40);
    let markup = format!("<p>{body}</p>");
    let text = extract_text(Some("Notes"), &markup);
    let total = text.chars().count();

    let hits = find_matches(&text, "dolor", MatchOptions::default());
    assert_eq!(hits.len(), 40);
    for hit in &hits {
        let window = hit.context_window.chars().count();
        assert!(window <= 2 * CONTEXT_RADIUS + "dolor".len());
        assert!(hit.context_start <= hit.absolute_index);
        assert!(hit.context_end <= total);
        let (_, matched, _) = hit.segments();
        assert_eq!(matched, "dolor");
    }
}

#[test]
fn search_and_clear_restore_page_bit_identically() {
    let mut surface = MemorySurface::new("Trip", PAGE);
    let mut controller = HighlightController::new(MatchOptions::default());

    for query in ["w", "wo", "world", "World", "a", "", "pass"] {
        controller.run_search(&mut surface, query);
        assert_eq!(strip_highlight_markers(&surface.markup()), PAGE);
    }
    controller.clear_search(&mut surface);
    assert_eq!(surface.markup(), PAGE);
}

#[test]
fn highlights_never_touch_attributes_or_scripts() {
    let mut surface = MemorySurface::new("Trip", PAGE);
    let mut controller = HighlightController::new(MatchOptions::default());
    controller.run_search(&mut surface, "world");

    let live = surface.markup();
    assert!(live.contains(r#"href="https://world.example""#));
    assert!(live.contains(r#"alt="world""#));
    assert!(live.contains("<script>var world = 1;</script>"));
    assert!(live.contains(r#"<strong><mark class="highlight">world</mark></strong>"#));
}

#[test]
fn regex_metacharacters_are_literal() {
    let text = "cost (approx.) is $5.00 or $5x00";
    let hits = find_matches(text, "$5.00", MatchOptions::default());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].matched_text, "$5.00");

    let hits = find_matches(text, "(approx.)", MatchOptions::default());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].absolute_index, 5);
}
