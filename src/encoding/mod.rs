mod color;
mod config;
mod resolve;

pub use color::{
    DIMMED_NODE, GroupPalette, SEARCH_HIGHLIGHT, opacity, palette_overrides, parse_color_or,
    severity_color, to_css, with_alpha,
};
pub use config::{
    DEFAULT_NODE_COLOR, EdgeColorStrategy, EdgeSizeStrategy, ForceParams, LabelConfig,
    LayoutConfig, LayoutKind, LayoutMode, NodeBorderConfig, NodeColorStrategy, NodeSizeStrategy,
    VisualConfig,
};
pub use resolve::{
    ResolveContext, hover_thickness, is_dashed, resolve_border_color, resolve_edge_color,
    resolve_edge_thickness, resolve_node_color, resolve_node_size,
};
