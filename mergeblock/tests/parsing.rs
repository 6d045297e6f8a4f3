use mergeblock::marker::collect_markers;
use mergeblock::parser::{build_flattened, build_tree, validate_nesting};
use mergeblock::{
    Block, BlockError, BlockParser, BlockTree, FieldCandidate, Snapshot, TargetId,
};

fn snapshot(targets: &[(&str, usize)]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for (name, position) in targets {
        snapshot.add_target(*name, *position);
    }
    snapshot
}

fn tree(snapshot: &Snapshot) -> BlockTree {
    BlockParser::new(snapshot).parse_tree().expect("parse failed")
}

fn triples<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Vec<(String, usize, usize)> {
    blocks
        .into_iter()
        .map(|b| (b.name().to_string(), b.start_position(), b.end_position()))
        .collect()
}

fn field_names(block: &Block) -> Vec<&str> {
    block.fields.iter().map(|f| f.name.as_str()).collect()
}

fn nested() -> Snapshot {
    snapshot(&[
        ("BlockStart_A", 0),
        ("BlockStart_B", 5),
        ("BlockEnd_B", 10),
        ("BlockEnd_A", 15),
    ])
}

#[test]
fn nested_blocks_form_a_tree() {
    let snapshot = nested();
    let tree = tree(&snapshot);

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.root_ids().len(), 1);

    let a_id = tree.root_ids()[0];
    let a = &tree[a_id];
    assert_eq!(a.name(), "A");
    assert_eq!((a.start_position(), a.end_position()), (0, 15));
    assert_eq!(a.parent, None);
    assert_eq!(a.children.len(), 1);

    let b_id = a.children[0];
    let b = &tree[b_id];
    assert_eq!(b.name(), "B");
    assert_eq!((b.start_position(), b.end_position()), (5, 10));
    assert_eq!(b.parent, Some(a_id));
    assert_eq!(tree.parent(b_id).map(Block::name), Some("A"));
    assert_eq!(tree.depth(b_id), 1);
    assert_eq!(tree.ancestors(b_id).collect::<Vec<_>>(), vec![a_id]);
}

#[test]
fn fields_attach_to_innermost_block() {
    let snapshot = nested()
        .with_field(FieldCandidate::merge_field("Inner", 6, 2))
        .with_field(FieldCandidate::merge_field("WholeInner", 5, 5))
        .with_field(FieldCandidate::merge_field("Outer", 1, 2))
        .with_field(FieldCandidate::new("Today", "DATE", 12, 1))
        .with_field(FieldCandidate::merge_field("Tail", 12, 2))
        .with_field(FieldCandidate::merge_field("WholeOuter", 0, 15))
        .with_field(FieldCandidate::merge_field("Outside", 20, 3));
    let tree = tree(&snapshot);

    let a_id = tree.root_ids()[0];
    let b_id = tree[a_id].children[0];
    // a field spanning exactly a child's markers belongs to the child
    assert_eq!(field_names(&tree[a_id]), vec!["Outer", "Tail", "WholeOuter"]);
    assert_eq!(field_names(&tree[b_id]), vec!["Inner", "WholeInner"]);

    let inner = &tree[b_id].fields[0];
    assert_eq!((inner.start, inner.length, inner.end()), (6, 2, 8));
}

#[test]
fn field_crossing_block_end_is_not_attached() {
    let snapshot = snapshot(&[("BlockStart_A", 0), ("BlockEnd_A", 5)])
        .with_field(FieldCandidate::merge_field("Straddle", 4, 3))
        .with_field(FieldCandidate::merge_field("Edge", 3, 2));
    let tree = tree(&snapshot);

    assert_eq!(field_names(tree.roots().next().unwrap()), vec!["Edge"]);
}

#[test]
fn field_extent_near_usize_max_saturates() {
    let snapshot = snapshot(&[("BlockStart_A", 0), ("BlockEnd_A", usize::MAX)])
        .with_field(FieldCandidate::merge_field("Huge", usize::MAX - 1, 5))
        .with_field(FieldCandidate::merge_field("Past", 10, usize::MAX));
    let tree = tree(&snapshot);

    assert_eq!(FieldCandidate::merge_field("x", usize::MAX - 1, 5).end(), usize::MAX);
    assert_eq!(field_names(tree.roots().next().unwrap()), vec!["Huge", "Past"]);
}

#[test]
fn disjoint_top_level_blocks() {
    let snapshot = snapshot(&[
        ("BlockStart_A", 0),
        ("BlockEnd_A", 5),
        ("BlockStart_B", 6),
        ("BlockEnd_B", 9),
    ]);
    let tree = tree(&snapshot);

    let names: Vec<&str> = tree.roots().map(Block::name).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(tree.roots().all(|b| b.parent.is_none() && b.children.is_empty()));

    let found = tree.find_innermost_containing(7).map(|id| tree[id].name());
    assert_eq!(found, Some("B"));
}

#[test]
fn mismatched_end_name_fails_validation() {
    let snapshot = snapshot(&[("BlockStart_A", 0), ("BlockEnd_B", 5)]);
    let err = BlockParser::new(&snapshot).validate().unwrap_err();

    assert_eq!(
        err,
        BlockError::MismatchedBlockName {
            expected: "A".into(),
            found: "B".into(),
            target: TargetId(1),
        }
    );
}

#[test]
fn lone_end_marker_fails_validation() {
    let snapshot = snapshot(&[("BlockEnd_A", 0)]);
    let err = BlockParser::new(&snapshot).validate().unwrap_err();

    assert_eq!(
        err,
        BlockError::UnmatchedEndMarker {
            name: "A".into(),
            target: TargetId(0),
        }
    );
}

#[test]
fn missing_outer_end_marker() {
    let snapshot = snapshot(&[("BlockStart_A", 0), ("BlockStart_B", 1), ("BlockEnd_B", 2)]);

    let markers = collect_markers(&snapshot);
    assert_eq!(
        build_tree(&markers, &[]).unwrap_err(),
        BlockError::TruncatedBlockStructure {
            open: "A".into(),
            target: TargetId(0),
        }
    );

    // validation catches it first when going through the parser
    assert_eq!(
        BlockParser::new(&snapshot).parse_tree().unwrap_err(),
        BlockError::UnclosedBlock {
            name: "A".into(),
            target: TargetId(0),
        }
    );
}

#[test]
fn unclosed_start_marker_fails_validation() {
    let snapshot = snapshot(&[("BlockStart_A", 0)]);
    assert!(matches!(
        BlockParser::new(&snapshot).validate(),
        Err(BlockError::UnclosedBlock { ref name, .. }) if name == "A"
    ));
}

#[test]
fn end_marker_at_top_level_is_not_a_block_start() {
    let snapshot = snapshot(&[("BlockStart_A", 0), ("BlockEnd_A", 1), ("BlockEnd_B", 2)]);
    let markers = collect_markers(&snapshot);

    assert_eq!(
        build_tree(&markers, &[]).unwrap_err(),
        BlockError::ExpectedBlockStart {
            found: "B".into(),
            target: TargetId(2),
        }
    );
}

#[test]
fn wrong_end_marker_in_tree_builder() {
    let snapshot = snapshot(&[("BlockStart_A", 0), ("BlockEnd_B", 5)]);
    let markers = collect_markers(&snapshot);

    assert_eq!(
        build_tree(&markers, &[]).unwrap_err(),
        BlockError::EndMarkerMismatch {
            expected: "A".into(),
            found: "B".into(),
            target: TargetId(1),
        }
    );
}

#[test]
fn prefixes_and_names_match_case_insensitively() {
    let snapshot = snapshot(&[("BlockStart_X", 0), ("blockend_x", 4)]);
    let markers = collect_markers(&snapshot);

    assert_eq!(markers.len(), 2);
    assert!(validate_nesting(&markers).is_ok());

    let tree = tree(&snapshot);
    assert_eq!(triples(tree.roots()), vec![("X".to_string(), 0, 4)]);
}

#[test]
fn empty_snapshot_yields_no_blocks() {
    let snapshot = Snapshot::new();
    let parser = BlockParser::new(&snapshot);

    assert!(parser.parse_tree().unwrap().is_empty());
    assert!(parser.parse_flattened().unwrap().is_empty());
    assert!(build_flattened(&[]).unwrap().is_empty());
}

#[test]
fn unrelated_targets_are_ignored() {
    let snapshot = snapshot(&[
        ("Bookmark1", 0),
        ("BlockStart_A", 1),
        ("_Toc123", 2),
        ("BlockEnd_A", 3),
        ("Block", 4),
    ]);
    let markers = collect_markers(&snapshot);

    let names: Vec<String> = markers.iter().map(|m| m.target_name()).collect();
    assert_eq!(names, vec!["BlockStart_A", "BlockEnd_A"]);
}

#[test]
fn markers_are_sorted_by_position() {
    let snapshot = snapshot(&[
        ("BlockEnd_A", 15),
        ("BlockStart_B", 5),
        ("BlockStart_A", 0),
        ("BlockEnd_B", 10),
    ]);
    let markers = collect_markers(&snapshot);

    let positions: Vec<usize> = markers.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![0, 5, 10, 15]);
    assert_eq!(markers[0].target, TargetId(2));
}

#[test]
fn equal_positions_keep_snapshot_order() {
    let snapshot = snapshot(&[
        ("BlockStart_Outer", 0),
        ("BlockStart_Inner", 0),
        ("BlockEnd_Inner", 3),
        ("BlockEnd_Outer", 3),
    ]);
    let tree = tree(&snapshot);

    let outer = tree.root_ids()[0];
    assert_eq!(tree[outer].name(), "Outer");

    let children: Vec<&str> = tree.children(outer).map(Block::name).collect();
    assert_eq!(children, vec!["Inner"]);
}

#[test]
fn tree_and_flat_builders_agree() {
    let snapshot = snapshot(&[
        ("BlockStart_Invoice", 0),
        ("BlockStart_Lines", 10),
        ("BlockStart_Discounts", 20),
        ("BlockEnd_Discounts", 30),
        ("BlockEnd_Lines", 40),
        ("BlockStart_Totals", 45),
        ("BlockEnd_Totals", 50),
        ("BlockEnd_Invoice", 60),
        ("BlockStart_Footer", 70),
        ("BlockEnd_Footer", 80),
    ]);
    let parser = BlockParser::new(&snapshot);
    let tree = parser.parse_tree().unwrap();
    let flat = parser.parse_flattened().unwrap();

    let from_tree: Vec<_> = tree.iter_depth_first().map(|(_, b)| b).collect();
    assert_eq!(triples(from_tree), triples(&flat));
    assert_eq!(triples(&tree.flatten()), triples(&flat));
    assert!(
        flat.iter()
            .all(|b| b.parent.is_none() && b.children.is_empty() && b.fields.is_empty())
    );
}

#[test]
fn children_nest_inside_parents_without_overlap() {
    let snapshot = snapshot(&[
        ("BlockStart_A", 0),
        ("BlockStart_B", 2),
        ("BlockStart_C", 3),
        ("BlockEnd_C", 4),
        ("BlockEnd_B", 5),
        ("BlockStart_D", 6),
        ("BlockEnd_D", 8),
        ("BlockEnd_A", 9),
    ]);
    let tree = tree(&snapshot);

    for (id, block) in tree.iter_depth_first() {
        let children: Vec<&Block> = tree.children(id).collect();
        for child in &children {
            assert!(child.start_position() >= block.start_position());
            assert!(child.end_position() <= block.end_position());
        }
        for pair in children.windows(2) {
            assert!(pair[0].end_position() < pair[1].start_position());
        }
    }
}

#[test]
fn deeply_nested_blocks_build_without_recursion() {
    const DEPTH: usize = 100_000;

    let mut snapshot = Snapshot::new();
    for i in 0..DEPTH {
        snapshot.add_target(format!("BlockStart_B{i}"), i);
    }
    for i in (0..DEPTH).rev() {
        snapshot.add_target(format!("BlockEnd_B{i}"), 2 * DEPTH - 1 - i);
    }

    let tree = tree(&snapshot);
    assert_eq!(tree.len(), DEPTH);
    assert_eq!(tree.root_ids().len(), 1);

    let innermost = tree
        .find_innermost_containing(DEPTH)
        .expect("innermost block");
    assert_eq!(tree[innermost].name(), format!("B{}", DEPTH - 1));
    assert_eq!(tree.depth(innermost), DEPTH - 1);
    assert_eq!(
        tree.iter_depth_first().count(),
        DEPTH,
        "every block is reachable from the root"
    );
}
