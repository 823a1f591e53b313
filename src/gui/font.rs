//! Fixed-cell bitmap font support for the GUI overlay.

use glam::{Vec2, vec2};

/// A bitmap font whose glyphs live in a fixed-size grid inside an atlas
/// texture, starting at `first_char` and reading row by row.
pub struct BitmapFont {
    first_char: char,
    chars_per_row: u32,
    char_width: u32,
    char_height: u32,
    atlas_width: u32,
    atlas_height: u32,
}

impl BitmapFont {
    /// Creates a new bitmap font from the given parameters.
    pub fn new(
        atlas_width: u32,
        atlas_height: u32,
        first_char: char,
        chars_per_row: u32,
        char_width: u32,
        char_height: u32,
    ) -> Self {
        BitmapFont {
            first_char,
            chars_per_row,
            char_width,
            char_height,
            atlas_width,
            atlas_height,
        }
    }

    /// Gets the UV coordinates for the given character.
    pub fn glyph_uv(&self, ch: char) -> Option<([f32; 2], [f32; 2])> {
        let glyph_index = (ch as u32).checked_sub(self.first_char as u32)?;

        if glyph_index >= self.chars_per_row * (self.atlas_height / self.char_height) {
            return None; // glyph not in atlas
        }

        let col = glyph_index % self.chars_per_row;
        let row = glyph_index / self.chars_per_row;

        let u0 = (col * self.char_width) as f32 / self.atlas_width as f32;
        let v0 = (row * self.char_height) as f32 / self.atlas_height as f32;
        let u1 = ((col + 1) * self.char_width) as f32 / self.atlas_width as f32;
        let v1 = ((row + 1) * self.char_height) as f32 / self.atlas_height as f32;

        Some(([u0, v0], [u1, v1]))
    }

    /// The width a single glyph occupies when text is rendered at
    /// `font_size` pixels tall.
    pub fn glyph_advance(&self, font_size: f32) -> f32 {
        self.char_width as f32 * font_size / self.char_height as f32
    }

    /// Calculates the width and height of the given text string at the
    /// specified font size.
    pub fn text_metrics(&self, text: &str, font_size: f32) -> Vec2 {
        let mut max_width = 0f32;
        let mut current_width = 0.0;
        let mut lines = 1;

        for ch in text.chars() {
            if ch == '\n' {
                max_width = max_width.max(current_width);
                current_width = 0.0;
                lines += 1;
                continue;
            }

            if self.glyph_uv(ch).is_some() {
                current_width += self.glyph_advance(font_size);
            }
        }

        max_width = max_width.max(current_width);
        let total_height = lines as f32 * font_size;

        vec2(max_width, total_height)
    }

    /// Lays out the glyph quads for the given text string at the specified
    /// position and font size. Yields one (rect, uv rect) pair per visible
    /// glyph.
    pub fn layout(
        &self,
        text: &str,
        start: Vec2,
        font_size: f32,
    ) -> Vec<([Vec2; 2], [Vec2; 2])> {
        let mut quads = Vec::new();
        let mut x = start.x;
        let mut y = start.y;

        for ch in text.chars() {
            if ch == '\n' {
                x = start.x;
                y += font_size;
                continue;
            }

            if let Some((uv0, uv1)) = self.glyph_uv(ch) {
                let w = self.glyph_advance(font_size);
                quads.push((
                    [vec2(x, y), vec2(x + w, y + font_size)],
                    [vec2(uv0[0], uv0[1]), vec2(uv1[0], uv1[1])],
                ));
                x += w;
            }
        }

        quads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_font() -> BitmapFont {
        // 16 glyphs per row of 8x8 cells, ASCII from space.
        BitmapFont::new(128, 48, ' ', 16, 8, 8)
    }

    #[test]
    fn test_first_glyph_is_top_left_cell() {
        let font = test_font();
        let (uv0, uv1) = font.glyph_uv(' ').unwrap();
        assert_eq!(uv0, [0.0, 0.0]);
        assert!((uv1[0] - 8.0 / 128.0).abs() < 1e-6);
        assert!((uv1[1] - 8.0 / 48.0).abs() < 1e-6);
    }

    #[test]
    fn test_glyph_rows_wrap() {
        let font = test_font();
        // '0' is glyph 16 from space, i.e. the first cell of row 1.
        let (uv0, _) = font.glyph_uv('0').unwrap();
        assert_eq!(uv0[0], 0.0);
        assert!((uv0[1] - 8.0 / 48.0).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_glyphs_are_missing() {
        let font = test_font();
        assert!(font.glyph_uv('\u{8}').is_none());
        assert!(font.glyph_uv('\u{2764}').is_none());
    }

    #[test]
    fn test_text_metrics_count_lines_and_columns() {
        let font = test_font();
        let metrics = font.text_metrics("ab\nabcd", 16.0);
        assert!((metrics.x - 4.0 * font.glyph_advance(16.0)).abs() < 1e-4);
        assert!((metrics.y - 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_layout_advances_per_glyph() {
        let font = test_font();
        let quads = font.layout("hi", vec2(10.0, 20.0), 16.0);
        assert_eq!(quads.len(), 2);
        let advance = font.glyph_advance(16.0);
        assert!((quads[1].0[0].x - (10.0 + advance)).abs() < 1e-4);
        assert_eq!(quads[0].0[0].y, 20.0);
    }
}
