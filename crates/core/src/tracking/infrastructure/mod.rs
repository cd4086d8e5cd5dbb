mod integral_image;
pub mod template_matcher;
