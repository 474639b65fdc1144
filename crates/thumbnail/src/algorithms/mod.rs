pub mod color_space;
pub mod colors;
pub mod compose;
pub mod filter;
pub mod gradient;
pub mod inpaint;
pub mod masks;

pub use colors::{ExtractorConfig, extract_corner_colors, extract_dominant_colors};
pub use compose::{
    apply_gradient_overlay, blend_masked_region_blur, blend_with_mask, extend_with_panel, paste,
    paste_at, stack_vertical, transition_mask,
};
pub use filter::gaussian_blur;
pub use gradient::{create_gradient, synthesize};
pub use inpaint::{InpaintConfig, InpaintStrategy, inpaint};
pub use masks::{grow, grow_and_blur, invert};
