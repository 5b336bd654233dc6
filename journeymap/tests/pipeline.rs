use indexmap::IndexMap;

use journeymap::layout::LayoutConfig;
use journeymap::model::{MarkupDocument, Procedure};
use journeymap::{layout_procedure_grid, layout_procedure_graph};

fn sample_document() -> MarkupDocument {
    MarkupDocument {
        slug: "checkout".into(),
        markup_type: "service".into(),
        display_markup_type: None,
        finedog_unit_meta: Default::default(),
        procedures: vec![Procedure {
            procedure_id: "p1".into(),
            display_name: None,
            start_block_ids: vec!["enter".into()],
            end_block_ids: vec!["confirm".into()],
            end_block_types: IndexMap::new(),
            branches: IndexMap::from([("enter".to_string(), vec!["confirm".to_string()])]),
            block_id_to_block_name: IndexMap::new(),
            procedure_meta: IndexMap::new(),
        }],
        block_graph: IndexMap::new(),
        procedure_graph: IndexMap::new(),
    }
}

#[test]
fn grid_pipeline_produces_at_least_one_element_per_block() {
    let document = sample_document();
    let (plan, elements) = layout_procedure_grid(&document, LayoutConfig::default());
    assert_eq!(plan.blocks.len(), 2);
    assert!(elements.len() >= plan.blocks.len());
}

#[test]
fn procedure_graph_pipeline_produces_one_frame_for_single_procedure() {
    let document = sample_document();
    let (plan, elements) = layout_procedure_graph(&document, LayoutConfig::default());
    assert_eq!(plan.frames.len(), 1);
    assert!(elements.iter().any(|e| matches!(e.meta, journeymap::diagram::ElementMeta::Frame { .. })));
}
