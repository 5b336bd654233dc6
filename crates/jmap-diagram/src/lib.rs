//! Abstract diagram element stream produced from a `LayoutPlan`. This
//! crate never touches pixels or a concrete drawing format; a
//! target-specific emitter outside this crate maps [`Element`]s to its
//! wire document.

mod converter;
mod element;
mod ids;
mod text_fit;

pub use converter::DiagramConverter;
pub use element::{BaseMeta, Element, ElementKind, ElementMeta, Geometry};
pub use ids::{element_id, ELEMENT_NAMESPACE};
pub use text_fit::{fit_text, FittedText, TextFitConfig};
