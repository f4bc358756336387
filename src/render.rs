use crate::types::{Plan, PlacedRoom};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Draws the plan's rooms as an ASCII grid, labelled with their names. The
/// boundary's y axis points up, so the first text row is the top edge.
pub fn render_plan(plan: &Plan) -> String {
    let (width, height) = (plan.boundary.width, plan.boundary.height);
    if !(width > 0.0 && height > 0.0) {
        return String::new();
    }
    // Character cells are roughly twice as tall as wide.
    let scale = f64::min(MAX_WIDTH / width, MAX_HEIGHT * 2.0 / height);
    let grid_w = (width * scale).round() as usize;
    let grid_h = (height * scale / 2.0).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];
    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for room in &plan.rooms {
        let (sx, sy, sw, sh) = cell_bounds(room, scale, grid_h);
        if sw == 0 || sh == 0 {
            continue;
        }
        draw_rect(&mut grid, sx, sy, sw, sh);
        write_label(&mut grid, &room.label, sx, sy, sw, sh);
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

/// Grid position of a room, flipped so that local y grows upwards.
fn cell_bounds(room: &PlacedRoom, scale: f64, grid_h: usize) -> (usize, usize, usize, usize) {
    let to_col = |v: f64| (v * scale).round().max(0.0) as usize;
    let to_row = |v: f64| (v * scale / 2.0).round().max(0.0) as usize;
    let sx = to_col(room.x);
    let sw = to_col(room.x + room.width).saturating_sub(sx);
    let top = grid_h.saturating_sub(to_row(room.y + room.height));
    let bottom = grid_h.saturating_sub(to_row(room.y));
    (sx, top, sw, bottom.saturating_sub(top))
}

fn write_label(grid: &mut [Vec<char>], label: &str, sx: usize, sy: usize, sw: usize, sh: usize) {
    let chars: Vec<char> = label.chars().collect();
    if sw <= 2 || sh == 0 {
        return;
    }
    let cx = sx + sw / 2;
    let cy = sy + sh / 2;
    let start_x = cx.saturating_sub(chars.len() / 2);
    for (i, &ch) in chars.iter().enumerate() {
        let x = start_x + i;
        if x > sx && x < sx + sw && cy > sy && cy < sy + sh && cy < grid.len() && x < grid[cy].len() {
            grid[cy][x] = ch;
        }
    }
}

fn junction(existing: char, line: char) -> char {
    match (existing, line) {
        ('+', _) => '+',
        ('|', '-') | ('-', '|') => '+',
        _ => line,
    }
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);

    for i in x..=x + w {
        for j in [y, y + h] {
            if i < cols && j < rows {
                grid[j][i] = junction(grid[j][i], '-');
            }
        }
    }
    for j in y..=y + h {
        for i in [x, x + w] {
            if i < cols && j < rows {
                grid[j][i] = junction(grid[j][i], '|');
            }
        }
    }
    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::types::Boundary;

    fn plan(rooms: Vec<PlacedRoom>, width: f64, height: f64) -> Plan {
        Plan {
            rooms,
            row_widths: vec![],
            col_heights: vec![],
            score: 0.0,
            candidates: 1,
            graph: Graph::default(),
            boundary: Boundary::new(width, height),
        }
    }

    fn room(label: &str, x: f64, y: f64, width: f64, height: f64) -> PlacedRoom {
        PlacedRoom {
            label: label.to_string(),
            x,
            y,
            width,
            height,
            target_area: None,
        }
    }

    #[test]
    fn test_render_single_room() {
        let output = render_plan(&plan(vec![room("hall", 0.0, 0.0, 10.0, 5.0)], 10.0, 5.0));
        assert!(output.contains('+'));
        assert!(output.contains('-'));
        assert!(output.contains('|'));
        assert!(output.contains("hall"));
    }

    #[test]
    fn test_render_two_rooms() {
        let output = render_plan(&plan(
            vec![
                room("west", 0.0, 0.0, 5.0, 10.0),
                room("east", 5.0, 0.0, 5.0, 10.0),
            ],
            10.0,
            10.0,
        ));
        assert!(output.contains("west"));
        assert!(output.contains("east"));
        let line = output.lines().find(|l| l.contains("west")).unwrap();
        assert!(line.find("west").unwrap() < line.find("east").unwrap());
    }

    #[test]
    fn test_render_stacked_rooms_top_first() {
        let output = render_plan(&plan(
            vec![
                room("low", 0.0, 0.0, 10.0, 5.0),
                room("up", 0.0, 5.0, 10.0, 5.0),
            ],
            10.0,
            10.0,
        ));
        assert!(output.find("up").unwrap() < output.find("low").unwrap());
    }

    #[test]
    fn test_render_empty() {
        let output = render_plan(&plan(vec![], 10.0, 10.0));
        assert!(output.contains('+'));
    }
}
