use image::{GrayImage, Rgb, RgbImage};

use super::backend::GlyphBackend;
use crate::algorithms::filter::to_u8;
use crate::types::{Color, TextBlock};

/// Text counts as fitting when it is no wider than this share of the available width.
pub const FIT_MARGIN: f32 = 0.95;

/// One positioned line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge of the text box.
    pub x: i32,
    pub center_y: i32,
    pub width: u32,
    pub height: u32,
}

/// A resolved layout: the chosen size and where each line goes.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: u32,
    pub bold: bool,
    pub color: Color,
    pub lines: Vec<PlacedLine>,
}

/// Lays out and renders horizontally centered text with a regular and a bold face.
pub struct TextEngine<B> {
    regular: B,
    bold: B,
}

impl<B: GlyphBackend> TextEngine<B> {
    pub fn new(regular: B, bold: B) -> Self {
        Self { regular, bold }
    }

    fn face(&self, bold: bool) -> &B {
        if bold { &self.bold } else { &self.regular }
    }

    pub fn measure(&self, text: &str, size: u32, bold: bool) -> (u32, u32) {
        self.face(bold).measure(text, size)
    }

    /// Largest size in `[min_size, initial_size]` whose width stays within
    /// `FIT_MARGIN * max_width`; `min_size` when nothing fits.
    pub fn fit_font_size(
        &self,
        text: &str,
        max_width: u32,
        bold: bool,
        initial_size: u32,
        min_size: u32,
    ) -> u32 {
        let limit = max_width as f32 * FIT_MARGIN;
        let (mut low, mut high) = (min_size.max(1), initial_size);
        let mut best = min_size.max(1);
        while low <= high {
            let mid = low + (high - low) / 2;
            let (width, _) = self.measure(text, mid, bold);
            if width as f32 <= limit {
                best = mid;
                low = mid + 1;
            } else {
                high = mid - 1;
            }
        }
        best
    }

    /// Single centered line; shrunk once proportionally if it overflows its container.
    pub fn layout_centered(&self, canvas_width: u32, block: &TextBlock) -> TextLayout {
        let container = block.max_width.unwrap_or(canvas_width);
        let mut size = block.font_size.max(1);
        let (mut width, mut height) = self.measure(&block.text, size, block.bold);
        if width > container {
            size = ((size as f32 * container as f32 / width as f32 * FIT_MARGIN) as u32).max(1);
            (width, height) = self.measure(&block.text, size, block.bold);
        }
        TextLayout {
            font_size: size,
            bold: block.bold,
            color: block.color,
            lines: vec![place(&block.text, canvas_width, block.anchor_y, width, height)],
        }
    }

    /// Centered text that shrinks toward `min_size`, then wraps on word
    /// boundaries. The last line's center sits at `block.anchor_y`; earlier
    /// lines stack upward `line_height * line_spacing` apart.
    pub fn layout_multiline(
        &self,
        canvas_width: u32,
        block: &TextBlock,
        min_size: u32,
        line_spacing: f32,
    ) -> TextLayout {
        let max_width = block.max_width.unwrap_or(canvas_width);
        let size =
            self.fit_font_size(&block.text, max_width, block.bold, block.font_size, min_size);
        let (width, height) = self.measure(&block.text, size, block.bold);

        let layout = |font_size: u32, lines: Vec<PlacedLine>| TextLayout {
            font_size,
            bold: block.bold,
            color: block.color,
            lines,
        };

        if width as f32 <= max_width as f32 * FIT_MARGIN {
            let line = place(&block.text, canvas_width, block.anchor_y, width, height);
            return layout(size, vec![line]);
        }

        let size = min_size.max(1);
        let wrapped = self.wrap(&block.text, max_width, size, block.bold);
        let measured: Vec<(String, (u32, u32))> = wrapped
            .into_iter()
            .map(|line| {
                let dims = self.measure(&line, size, block.bold);
                (line, dims)
            })
            .collect();
        let line_height = measured.iter().map(|(_, (_, h))| *h).max().unwrap_or(0);
        let step = line_height as f32 * line_spacing;
        let count = measured.len();

        let lines = measured
            .into_iter()
            .enumerate()
            .map(|(i, (text, (w, h)))| {
                let center = block.anchor_y - ((count - 1 - i) as f32 * step).round() as i32;
                place(&text, canvas_width, center, w, h)
            })
            .collect();
        layout(size, lines)
    }

    /// Greedy word wrap: a word joins the current line while the line stays within `max_width`.
    fn wrap(&self, text: &str, max_width: u32, size: u32, bold: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
                continue;
            }
            let candidate = format!("{current} {word}");
            if self.measure(&candidate, size, bold).0 <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    /// Rasterize a layout onto a transparent layer and composite it over `image`.
    pub fn render(&self, image: &RgbImage, layout: &TextLayout) -> RgbImage {
        let mut coverage = GrayImage::new(image.width(), image.height());
        let face = self.face(layout.bold);
        // Lines are centered on the middle of the font's ascent-descent band,
        // not on the ink, so mixed-case lines share a baseline.
        let (ascent, descent) = face.vertical_metrics(layout.font_size);
        let half_line = ((ascent - descent) / 2.0) as i32;
        for line in &layout.lines {
            let top = line.center_y - half_line;
            face.draw(&mut coverage, &line.text, layout.font_size, line.x, top);
        }

        let color = layout.color.channels();
        let mut out = image.clone();
        for (pixel, alpha) in out.pixels_mut().zip(coverage.pixels()) {
            let a = alpha[0] as f32 / 255.0;
            if a > 0.0 {
                *pixel = Rgb([0, 1, 2]
                    .map(|c| to_u8(pixel[c] as f32 * (1.0 - a) + color[c] as f32 * a)));
            }
        }
        out
    }

    pub fn draw_centered(&self, image: &RgbImage, block: &TextBlock) -> RgbImage {
        self.render(image, &self.layout_centered(image.width(), block))
    }

    pub fn draw_centered_multiline(
        &self,
        image: &RgbImage,
        block: &TextBlock,
        min_size: u32,
        line_spacing: f32,
    ) -> RgbImage {
        self.render(image, &self.layout_multiline(image.width(), block, min_size, line_spacing))
    }
}

fn place(text: &str, canvas_width: u32, center_y: i32, width: u32, height: u32) -> PlacedLine {
    PlacedLine {
        text: text.to_string(),
        x: canvas_width as i32 / 2 - width as i32 / 2,
        center_y,
        width,
        height,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Luma;

    /// Every character is `size / 2` wide and the line is `size` tall.
    pub(crate) struct FixedAdvance;

    impl GlyphBackend for FixedAdvance {
        fn measure(&self, text: &str, size: u32) -> (u32, u32) {
            (text.chars().count() as u32 * size / 2, size)
        }

        fn vertical_metrics(&self, size: u32) -> (f32, f32) {
            (size as f32, 0.0)
        }

        fn draw(&self, coverage: &mut GrayImage, text: &str, size: u32, x: i32, y: i32) {
            let (w, h) = self.measure(text, size);
            for dy in 0..h as i32 {
                for dx in 0..w as i32 {
                    let (px, py) = (x + dx, y + dy);
                    let inside = px >= 0
                        && py >= 0
                        && (px as u32) < coverage.width()
                        && (py as u32) < coverage.height();
                    if inside {
                        coverage.put_pixel(px as u32, py as u32, Luma([255]));
                    }
                }
            }
        }
    }

    fn engine() -> TextEngine<FixedAdvance> {
        TextEngine::new(FixedAdvance, FixedAdvance)
    }

    fn block(text: &str, size: u32, max_width: Option<u32>) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            anchor_y: 100,
            font_size: size,
            color: Color::WHITE,
            max_width,
            bold: true,
        }
    }

    #[test]
    fn test_fit_font_size_is_maximal() {
        let e = engine();
        // 10 chars: width = 5 * size; limit 0.95 * 200 = 190 -> size 38.
        let size = e.fit_font_size("abcdefghij", 200, false, 50, 10);
        assert_eq!(size, 38);
        assert!(e.measure("abcdefghij", size, false).0 as f32 <= 190.0);
        assert!(e.measure("abcdefghij", size + 1, false).0 as f32 > 190.0);
    }

    #[test]
    fn test_fit_font_size_bounds() {
        let e = engine();
        assert_eq!(e.fit_font_size("ab", 1000, false, 50, 10), 50);
        assert_eq!(e.fit_font_size("a very long string", 10, false, 50, 12), 12);
    }

    #[test]
    fn test_centered_shrinks_on_overflow() {
        let e = engine();
        // 20 chars at 30px = 300 wide in a 210 container -> int(30 * 210/300 * 0.95) = 19.
        let layout = e.layout_centered(210, &block("abcdefghijklmnopqrst", 30, None));
        assert_eq!(layout.font_size, 19);
        assert_eq!(layout.lines[0].width, 190);
        assert_eq!(layout.lines[0].x, 10);
    }

    #[test]
    fn test_centered_keeps_size_when_fitting() {
        let layout = engine().layout_centered(512, &block("Provider", 18, None));
        assert_eq!(layout.font_size, 18);
        assert_eq!(layout.lines[0].center_y, 100);
        assert_eq!(layout.lines[0].x, 256 - 36);
    }

    #[test]
    fn test_multiline_single_line_when_fitting() {
        let layout =
            engine().layout_multiline(512, &block("Dragon Coins", 50, Some(312)), 28, 1.15);
        // 12 chars: 6 * size <= 296.4 -> 49.
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.font_size, 49);
        assert_eq!(layout.lines[0].center_y, 100);
    }

    #[test]
    fn test_multiline_wraps_at_min_size() {
        let e = engine();
        let text = "Mighty Golden Dragon Treasure Coins";
        let layout = e.layout_multiline(512, &block(text, 50, Some(312)), 28, 1.15);
        assert_eq!(layout.font_size, 28);
        assert!(layout.lines.len() > 1);
        assert_eq!(layout.lines.last().map(|l| l.center_y), Some(100));
        for line in &layout.lines {
            assert!(line.width <= 312, "{:?} overflows", line.text);
        }
        let joined: Vec<&str> = layout.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(joined.join(" "), text);
        // 28px lines, 1.15 spacing -> 32px apart.
        let centers: Vec<i32> = layout.lines.iter().map(|l| l.center_y).collect();
        for pair in centers.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(centers[centers.len() - 2], 100 - 32);
    }

    #[test]
    fn test_three_lines_pin_last_line_to_anchor() {
        let e = engine();
        // At 10px each char is 5px wide, so a 100px box holds 20 chars per line.
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india";
        let layout = e.layout_multiline(400, &block(text, 40, Some(100)), 10, 1.5);
        assert_eq!(layout.lines.len(), 3);
        let centers: Vec<i32> = layout.lines.iter().map(|l| l.center_y).collect();
        assert_eq!(centers, vec![70, 85, 100]);
    }

    #[test]
    fn test_real_font_ink_is_centered_on_anchor() {
        use crate::text::FontBackend;

        let (Ok(regular), Ok(bold)) = (
            FontBackend::load("dejavu/DejaVuSans.ttf"),
            FontBackend::load("dejavu/DejaVuSans-Bold.ttf"),
        ) else {
            eprintln!("DejaVu fonts not installed, skipping");
            return;
        };
        let e = TextEngine::new(regular, bold);
        let image = RgbImage::from_pixel(800, 400, Rgb([0, 0, 0]));
        for (text, size) in [("PRAGMATIC PLAY", 18), ("Sweet Bonanza", 50), ("HOUSE", 100)] {
            let text_block = TextBlock { anchor_y: 200, ..block(text, size, None) };
            let out = e.draw_centered(&image, &text_block);
            let inked: Vec<u32> = (0..out.height())
                .filter(|&y| (0..out.width()).any(|x| out.get_pixel(x, y)[0] > 127))
                .collect();
            let (first, last) = (inked[0], inked[inked.len() - 1]);
            let center = (first + last) as f32 / 2.0;
            let tolerance = (size as f32 * 0.05).max(2.0);
            assert!(
                (center - 200.0).abs() <= tolerance,
                "{text:?} at {size}px: ink centered at {center}"
            );
        }
    }

    #[test]
    fn test_render_paints_color_inside_box_only() {
        let e = engine();
        let image = RgbImage::from_pixel(200, 200, Rgb([0, 0, 0]));
        let out = e.draw_centered(&image, &block("abcd", 20, None));
        // 40x20 box centered at (100, 100).
        assert_eq!(*out.get_pixel(100, 100), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(81, 91), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(79, 100), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(100, 89), Rgb([0, 0, 0]));
    }
}
