//! Session behavior across selection, gestures, clipboard and loading

use flowgraph::prelude::*;

fn session_with(ids: &[&str]) -> EditorSession {
    let mut session = EditorSession::new();
    for (i, id) in ids.iter().enumerate() {
        session
            .create_node(
                NodeSpec::new(ShapeKind::Rect)
                    .with_id(*id)
                    .at(0.0, 100.0 * i as f64),
            )
            .unwrap();
    }
    session
}

#[test]
fn test_selection_modes() {
    let mut session = session_with(&["a", "b", "c"]);

    session.select(&["a", "ghost"], SelectMode::Exclusive);
    assert_eq!(session.selected(), &["a".to_string()]);

    session.select(&["b"], SelectMode::Additive);
    assert_eq!(session.selected().len(), 2);

    session.select(&["a", "c"], SelectMode::Toggle);
    assert!(!session.is_selected("a"));
    assert!(session.is_selected("b"));
    assert!(session.is_selected("c"));

    session.clear_selection();
    assert!(session.selected().is_empty());
}

#[test]
fn test_selection_change_events() {
    let mut session = session_with(&["a"]);
    session.take_changes();

    session.select(&["a"], SelectMode::Exclusive);
    assert_eq!(session.take_changes(), vec![ChangeEvent::SelectionChanged]);

    session.select(&["a"], SelectMode::Exclusive);
    assert!(session.take_changes().is_empty());
}

#[test]
fn test_delete_selected() {
    let mut session = session_with(&["a", "b"]);
    session
        .create_edge(Endpoint::port("a", "bottom"), Endpoint::port("b", "top"))
        .unwrap();
    session.select(&["a"], SelectMode::Exclusive);

    let removed = session.delete_selected(false).unwrap();
    assert_eq!(removed, vec!["a".to_string(), "edge_1".to_string()]);
    assert!(session.selected().is_empty());
    assert_eq!(session.document().edge_count(), 0);

    assert!(session.delete_selected(false).unwrap().is_empty());
}

#[test]
fn test_gesture_is_one_undo_step() {
    let mut session = session_with(&["a"]);
    let undo_before = session.history().undo_len();

    session.begin_gesture();
    for _ in 0..5 {
        session.move_cells(&["a"], 2.0, 1.0).unwrap();
    }
    assert!(session.commit_gesture());

    assert_eq!(session.history().undo_len(), undo_before + 1);
    assert_eq!(
        session.document().get_node("a").unwrap().position,
        Point::new(10.0, 5.0)
    );

    session.undo().unwrap();
    assert_eq!(
        session.document().get_node("a").unwrap().position,
        Point::new(0.0, 0.0)
    );
}

#[test]
fn test_cancelled_gesture_leaves_no_trace() {
    let mut session = session_with(&["a"]);
    let snapshot = session.document().clone();
    let undo_before = session.history().undo_len();

    session.begin_gesture();
    session.move_cells(&["a"], 30.0, 30.0).unwrap();
    session.resize_node("a", Size::new(10.0, 10.0)).unwrap();
    session.cancel_gesture().unwrap();

    assert_eq!(session.document(), &snapshot);
    assert_eq!(session.history().undo_len(), undo_before);
}

#[test]
fn test_new_command_clears_redo() {
    let mut session = session_with(&["a"]);
    session.move_cells(&["a"], 1.0, 0.0).unwrap();
    session.undo().unwrap();
    assert!(session.can_redo());

    session.rotate_node("a", 90.0).unwrap();
    assert!(!session.can_redo());
}

#[test]
fn test_history_limit() {
    let config = EditorConfig::default().with_history_limit(3);
    let mut session = EditorSession::with_config(config);
    session
        .create_node(NodeSpec::new(ShapeKind::Rect).with_id("a"))
        .unwrap();
    for _ in 0..10 {
        session.move_cells(&["a"], 1.0, 0.0).unwrap();
    }
    assert_eq!(session.history().undo_len(), 3);

    let mut undone = 0;
    while session.undo().unwrap() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(
        session.document().get_node("a").unwrap().position.x,
        7.0
    );
}

#[test]
fn test_copy_paste_offsets_and_remaps() {
    let mut session = session_with(&["a", "b"]);
    session
        .create_edge(Endpoint::port("a", "bottom"), Endpoint::port("b", "top"))
        .unwrap();

    session.select(&["a", "b"], SelectMode::Exclusive);
    assert_eq!(session.copy_selection(), 2);

    let pasted = session.paste().unwrap();
    assert_eq!(pasted.len(), 3);
    assert_eq!(session.document().node_count(), 4);
    assert_eq!(session.document().edge_count(), 2);
    assert_eq!(session.selected(), pasted.as_slice());

    let copy = session.document().get_node(&pasted[0]).unwrap();
    assert_eq!(copy.position, Point::new(20.0, 20.0));

    let edge = session.document().get_edge(&pasted[2]).unwrap();
    assert_eq!(edge.source.cell, pasted[0]);
    assert_eq!(edge.target.cell, pasted[1]);

    let second = session.paste().unwrap();
    let again = session.document().get_node(&second[0]).unwrap();
    assert_eq!(again.position, Point::new(40.0, 40.0));

    session.undo().unwrap();
    session.undo().unwrap();
    assert_eq!(session.document().node_count(), 2);
}

#[test]
fn test_paste_empty_clipboard() {
    let mut session = session_with(&["a"]);
    assert!(session.clipboard_is_empty());
    assert!(session.paste().unwrap().is_empty());
    assert_eq!(session.copy(&["ghost"]), 0);
}

#[test]
fn test_from_json_failure_keeps_session() {
    let mut session = session_with(&["a"]);
    let before = session.document().clone();

    let result = session.from_json_str(
        r#"{"nodes": [{"id": "x", "shape": "flow-chart-rect", "parent": "x"}]}"#,
    );
    assert!(result.is_err());
    assert_eq!(session.document(), &before);
    assert!(session.can_undo());

    let result = session.from_json_str(r#"{"nodes": [{"id": 1}]}"#);
    assert!(matches!(result, Err(GraphError::Json { .. })));
}

#[test]
fn test_from_json_resets_session() {
    let mut session = session_with(&["a"]);
    session.select(&["a"], SelectMode::Exclusive);
    session.take_changes();

    session
        .from_json_str(r#"{"nodes": [{"id": "z", "shape": "flow-chart-rect"}]}"#)
        .unwrap();
    assert!(!session.can_undo());
    assert!(session.selected().is_empty());
    assert_eq!(session.take_changes(), vec![ChangeEvent::Reset]);

    let fresh = session
        .create_node(NodeSpec::new(ShapeKind::Rect))
        .unwrap();
    assert_eq!(fresh.id, "node_1");
}

#[test]
fn test_unregistered_shape_rejected_on_load() {
    let mut session = EditorSession::with_parts(
        EditorConfig::default(),
        flowgraph::ShapeCatalog::new(),
        StencilRegistry::new(),
    );
    let result = session.from_json_str(r#"{"nodes": [{"id": "a", "shape": "flow-chart-rect"}]}"#);
    assert!(matches!(result, Err(GraphError::InvalidSpec { .. })));
}

#[test]
fn test_undo_prunes_selection() {
    let mut session = session_with(&["a"]);
    session.select(&["a"], SelectMode::Exclusive);
    session.undo().unwrap();
    assert!(session.selected().is_empty());
}

#[test]
fn test_collapse_emits_visibility_events() {
    let mut session = EditorSession::new();
    session
        .create_node(NodeSpec::new(ShapeKind::Group).with_id("g"))
        .unwrap();
    session
        .create_node(NodeSpec::new(ShapeKind::Rect).with_id("c").with_parent("g"))
        .unwrap();
    session.take_changes();

    session.set_collapsed("g", true).unwrap();
    let changes = session.take_changes();
    assert!(changes.contains(&ChangeEvent::VisibilityChanged {
        id: "c".into(),
        visible: false
    }));

    session.undo().unwrap();
    assert!(session.is_visible("c"));
}

#[test]
fn test_nested_collapsed_group_stays_hidden_on_expand() {
    let mut session = EditorSession::new();
    session
        .create_node(NodeSpec::new(ShapeKind::Group).with_id("outer"))
        .unwrap();
    session
        .create_node(NodeSpec::new(ShapeKind::Group).with_id("inner").with_parent("outer"))
        .unwrap();
    session
        .create_node(NodeSpec::new(ShapeKind::Rect).with_id("leaf").with_parent("inner"))
        .unwrap();

    session.set_collapsed("inner", true).unwrap();
    session.set_collapsed("outer", true).unwrap();
    session.set_collapsed("outer", false).unwrap();

    assert!(session.is_visible("inner"));
    assert!(!session.is_visible("leaf"));
}

#[test]
fn test_moving_child_out_of_collapsed_group_shows_it() {
    let mut session = EditorSession::new();
    session
        .create_node(NodeSpec::new(ShapeKind::Group).with_id("g"))
        .unwrap();
    session
        .create_node(NodeSpec::new(ShapeKind::Rect).with_id("c").with_parent("g"))
        .unwrap();
    session.set_collapsed("g", true).unwrap();
    assert!(!session.is_visible("c"));

    session.set_parent("c", None).unwrap();
    assert!(session.is_visible("c"));
}

fn group_chain(session: &mut EditorSession, prefix: &str, len: usize) -> GraphResult<()> {
    session.create_node(NodeSpec::new(ShapeKind::Group).with_id(format!("{}0", prefix)))?;
    for i in 1..len {
        session.create_node(
            NodeSpec::new(ShapeKind::Group)
                .with_id(format!("{}{}", prefix, i))
                .with_parent(format!("{}{}", prefix, i - 1)),
        )?;
    }
    Ok(())
}

#[test]
fn test_collapsing_deepest_allowed_chain_hides_everything() {
    let mut session = EditorSession::new();
    group_chain(&mut session, "g", flowgraph::MAX_GROUP_DEPTH).unwrap();

    let too_deep = session.create_node(
        NodeSpec::new(ShapeKind::Rect)
            .with_id("leaf")
            .with_parent(format!("g{}", flowgraph::MAX_GROUP_DEPTH - 1)),
    );
    assert!(matches!(too_deep, Err(GraphError::InvalidSpec { .. })));
    assert!(!session.document().contains("leaf"));

    session.toggle_collapse("g0").unwrap();
    let visible: Vec<&str> = session
        .document()
        .nodes()
        .filter(|n| session.is_visible(&n.id))
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(visible, vec!["g0"]);
}

#[test]
fn test_set_parent_rejects_subtree_past_depth_bound() {
    let mut session = EditorSession::new();
    group_chain(&mut session, "a", 200).unwrap();
    group_chain(&mut session, "b", 100).unwrap();

    let result = session.set_parent("b0", Some("a199"));
    assert!(matches!(result, Err(GraphError::InvalidSpec { .. })));
    assert_eq!(session.document().get_node("b0").unwrap().parent, None);
}

#[test]
fn test_from_json_rejects_overly_deep_document() {
    let mut session = session_with(&["a"]);
    let nodes: Vec<serde_json::Value> = (0..flowgraph::MAX_GROUP_DEPTH + 5)
        .map(|i| {
            let mut node = serde_json::json!({"id": format!("g{}", i), "shape": "group-node", "group": true});
            if i == 0 {
                node["collapsed"] = serde_json::json!(true);
            } else {
                node["parent"] = serde_json::json!(format!("g{}", i - 1));
            }
            node
        })
        .collect();

    let result = session.from_json(serde_json::json!({ "nodes": nodes }));
    assert!(matches!(result, Err(GraphError::InvalidSpec { .. })));
    assert!(session.document().contains("a"));
}

#[test]
fn test_paste_under_deepened_parent_is_refused() {
    let mut session = EditorSession::new();
    group_chain(&mut session, "a", flowgraph::MAX_GROUP_DEPTH - 1).unwrap();
    session
        .create_node(NodeSpec::new(ShapeKind::Group).with_id("g"))
        .unwrap();
    session
        .create_node(NodeSpec::new(ShapeKind::Rect).with_id("c").with_parent("g"))
        .unwrap();

    assert_eq!(session.copy(&["c"]), 1);
    session.remove_cells(&["c"], false).unwrap();
    let deepest = format!("a{}", flowgraph::MAX_GROUP_DEPTH - 2);
    session.set_parent("g", Some(deepest.as_str())).unwrap();

    let before = session.document().clone();
    let result = session.paste();
    assert!(matches!(result, Err(GraphError::InvalidSpec { .. })));
    assert_eq!(session.document(), &before);
}
