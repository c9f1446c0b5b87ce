use pretty_assertions::assert_eq;
use termedit_core::{
    BufferId, Cursor, EditorConfig, Movement, ScreenPos, ViewId, Workspace,
};

fn numbered(count: usize) -> String {
    (0..count).map(|i| format!("line {i}\n")).collect()
}

fn open(text: &str, width: usize, height: usize) -> (Workspace, BufferId, ViewId) {
    let mut ws = Workspace::new(EditorConfig::default());
    let buffer = ws.open_buffer(None, text);
    let view = ws.create_view(buffer, width, height).unwrap();
    (ws, buffer, view)
}

#[test]
fn test_small_buffer_draws_from_the_top() {
    let (mut ws, _, view) = open("a\nb\nc\n", 40, 10);
    ws.move_cursor(view, Movement::GotoLine(3)).unwrap();
    let grid = ws.render(view).unwrap();
    assert_eq!(grid.cursor, ScreenPos { x: 0, y: 2 });
    assert_eq!(grid.line_count(), 4);
    assert_eq!(grid.lines[0].row_index, 0);
}

#[test]
fn test_scrolling_down_keeps_cursor_above_bottom_band() {
    let (mut ws, _, view) = open(&numbered(100), 40, 10);
    ws.render(view).unwrap();
    for row in 1..30 {
        ws.move_cursor(view, Movement::NextLine).unwrap();
        let grid = ws.render(view).unwrap();
        let y = grid.cursor.y;
        assert_eq!(y, row.min(5), "row {row}");
        assert_eq!(grid.lines[y].row_index, row);
        assert_eq!(grid.line_count(), 10);
    }

    // moving back up pins the cursor to the top of the band
    for row in (20..29).rev() {
        ws.move_cursor(view, Movement::PrevLine).unwrap();
        let grid = ws.render(view).unwrap();
        assert_eq!(grid.cursor.y, 4, "row {row}");
        assert_eq!(grid.lines[4].row_index, row);
    }
}

#[test]
fn test_goto_line_recenters() {
    let (mut ws, _, view) = open(&numbered(100), 40, 10);
    ws.render(view).unwrap();
    ws.move_cursor(view, Movement::GotoLine(50)).unwrap();
    let grid = ws.render(view).unwrap();
    assert_eq!(grid.cursor.y, 4);
    assert_eq!(grid.lines[0].row_index, 45);
    assert_eq!(grid.lines[4].row_index, 49);
}

#[test]
fn test_buffer_end_leaves_threshold_below() {
    let (mut ws, _, view) = open(&numbered(100), 40, 10);
    ws.render(view).unwrap();
    ws.move_cursor(view, Movement::BufferEnd).unwrap();
    let grid = ws.render(view).unwrap();
    assert_eq!(grid.cursor.y, 5);
    assert_eq!(grid.line_count(), 6);
    assert_eq!(grid.lines[5].row_index, 100);
    assert_eq!(grid.lines[5].text(), "◂");
}

#[test]
fn test_view_can_start_inside_a_wrapped_row() {
    let (mut ws, _, view) = open(&"word ".repeat(30), 20, 5);
    ws.move_cursor(view, Movement::BufferEnd).unwrap();
    let last = ws
        .with_view(view, |v, rows| v.layout(rows, 0).unwrap().line_count() - 1)
        .unwrap();
    assert!(last > 4);

    let grid = ws.render(view).unwrap();
    assert_eq!(grid.cursor.y, 2);
    assert_eq!(grid.line_count(), 3);
    assert!(grid.lines[0].is_wrapped_part);
    assert_eq!(grid.lines[0].sub_line, last - 2);
    assert_eq!(grid.lines[2].sub_line, last);
    assert_eq!(grid.lines[2].cells.last().unwrap().ch, '◂');
}

#[test]
fn test_single_line_viewport_follows_the_cursor() {
    let (mut ws, _, view) = open(&numbered(20), 40, 1);
    for row in 0..5 {
        let grid = ws.render(view).unwrap();
        assert_eq!(grid.cursor.y, 0);
        assert_eq!(grid.line_count(), 1);
        assert_eq!(grid.lines[0].row_index, row);
        ws.move_cursor(view, Movement::NextLine).unwrap();
    }
}

#[test]
fn test_resize_rewraps() {
    let text = "the quick brown fox jumps over the lazy dog\n";
    let (mut ws, _, view) = open(text, 80, 10);
    assert_eq!(ws.render(view).unwrap().line_count(), 2);
    ws.resize_view(view, 20, 10).unwrap();
    let grid = ws.render(view).unwrap();
    assert!(grid.line_count() > 2);
    for line in &grid.lines {
        assert!(line.visual_width() <= 20);
    }
    let rebuilt: String = grid
        .lines
        .iter()
        .filter(|l| l.row_index == 0)
        .flat_map(|l| l.cells.iter())
        .filter(|c| c.ch != '\\' && c.ch != '↵')
        .map(|c| c.ch)
        .collect();
    assert_eq!(rebuilt, text.trim_end());
}

#[test]
fn test_screen_cell_maps_back_to_buffer_position() {
    let (mut ws, _, view) = open("ab\tc\n日本語\n", 40, 10);
    ws.render(view).unwrap();
    let hit = |ws: &mut Workspace, x, y| {
        ws.with_view(view, |v, rows| v.cursor_at_screen(rows, ScreenPos { x, y }))
            .unwrap()
    };
    assert_eq!(hit(&mut ws, 3, 0), Some(Cursor::new(0, 2)));
    assert_eq!(hit(&mut ws, 4, 0), Some(Cursor::new(0, 3)));
    assert_eq!(hit(&mut ws, 3, 1), Some(Cursor::new(1, 1)));
    assert_eq!(hit(&mut ws, 0, 7), None);
}
