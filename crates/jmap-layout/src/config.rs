//! Geometric constants for both layout engines. Every field is overridable;
//! the defaults match the reference engine's grid and procedure-graph
//! layouts.

use jmap_model::Size;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub block_size: Size,
    pub marker_size: Size,
    pub padding: f64,
    pub gap_x: f64,
    pub gap_y: f64,
    pub lane_gap: f64,
    pub separator_margin_x: f64,
    pub separator_padding_y: f64,
    pub scenario_width: f64,
    pub scenario_padding: f64,
    pub zone_pad_x: f64,
    pub zone_pad_y: f64,
    pub zone_label_height: f64,
    pub zone_label_gap: f64,
    pub zone_border_gap_x: f64,
    pub zone_border_gap_y: f64,
    pub merge_node_min_chain_size: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            block_size: Size::new(260.0, 120.0),
            marker_size: Size::new(70.0, 50.0),
            padding: 120.0,
            gap_x: 120.0,
            gap_y: 80.0,
            lane_gap: 300.0,
            separator_margin_x: 40.0,
            separator_padding_y: 60.0,
            scenario_width: 320.0,
            scenario_padding: 24.0,
            zone_pad_x: 40.0,
            zone_pad_y: 32.0,
            zone_label_height: 28.0,
            zone_label_gap: 8.0,
            zone_border_gap_x: 16.0,
            zone_border_gap_y: 16.0,
            merge_node_min_chain_size: 2,
        }
    }
}
